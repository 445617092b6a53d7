use lectern_storage::{ConversationId, DocumentPath, IdResult, MessageId};

pub const DEFAULT_CONVERSATIONS_ROOT: &str = "conversations";
pub const MESSAGES_COLLECTION: &str = "messages";
pub const DEFAULT_TESTCASES_COLLECTION: &str = "testcases";

/// Where conversations and test cases live in the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    conversations_root: DocumentPath,
    messages: DocumentPath,
    testcases: DocumentPath,
}

impl RemoteLayout {
    pub fn new(conversations_root: &str, testcases_collection: &str) -> IdResult<Self> {
        Ok(Self {
            conversations_root: DocumentPath::collection(conversations_root)?,
            messages: DocumentPath::collection(MESSAGES_COLLECTION)?,
            testcases: DocumentPath::collection(testcases_collection)?,
        })
    }

    pub fn with_defaults() -> IdResult<Self> {
        Self::new(DEFAULT_CONVERSATIONS_ROOT, DEFAULT_TESTCASES_COLLECTION)
    }

    /// `{root}/{conversation}/messages`
    pub fn messages_collection(&self, conversation_id: &ConversationId) -> DocumentPath {
        self.conversations_root
            .join(&DocumentPath::from(conversation_id))
            .join(&self.messages)
    }

    /// `{root}/{conversation}/messages/{message}`
    pub fn message_document(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) -> DocumentPath {
        self.messages_collection(conversation_id)
            .join(&DocumentPath::from(message_id))
    }

    pub fn testcases_collection(&self) -> &DocumentPath {
        &self.testcases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_documented_paths() {
        let layout = RemoteLayout::with_defaults().unwrap();
        let conversation = ConversationId::parse("c1").unwrap();
        let message = MessageId::parse("m9").unwrap();

        assert_eq!(
            layout.message_document(&conversation, &message).to_string(),
            "conversations/c1/messages/m9"
        );
        assert_eq!(
            layout.messages_collection(&conversation).to_string(),
            "conversations/c1/messages"
        );
        assert!(layout.message_document(&conversation, &message).is_document());
        assert_eq!(layout.testcases_collection().to_string(), "testcases");
    }

    #[test]
    fn layout_rejects_nested_collection_names() {
        assert!(RemoteLayout::new("a/b", "testcases").is_err());
        assert!(RemoteLayout::new("conversations", "").is_err());
    }
}
