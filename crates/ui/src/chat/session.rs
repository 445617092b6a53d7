use lectern_storage::{ConversationId, DocumentSource, IdError, MessageId, RemoteReadError};
use snafu::{ResultExt, Snafu};

use crate::chat::message::{Message, MessageDocument};
use crate::chat::paths::RemoteLayout;
use crate::chat::store::MessageStore;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(display("failed to fetch conversation '{conversation_id}' on `{stage}`: {source}"))]
    FetchConversation {
        stage: &'static str,
        conversation_id: ConversationId,
        source: RemoteReadError,
    },
    #[snafu(display("message document '{path}' is malformed on `{stage}`: {source}"))]
    DecodeMessage {
        stage: &'static str,
        path: String,
        source: serde_json::Error,
    },
    #[snafu(display("message document '{path}' has an invalid id on `{stage}`: {source}"))]
    InvalidMessageId {
        stage: &'static str,
        path: String,
        source: IdError,
    },
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Owns the message cache for the conversation currently on screen.
///
/// Opening a conversation hydrates it from the document source and tears down
/// the previously open one, so the cache only ever holds the active view.
#[derive(Debug)]
pub struct ChatSession {
    layout: RemoteLayout,
    store: MessageStore,
    active: Option<ConversationId>,
}

impl ChatSession {
    pub fn new(layout: RemoteLayout) -> Self {
        Self {
            layout,
            store: MessageStore::new(),
            active: None,
        }
    }

    pub fn layout(&self) -> &RemoteLayout {
        &self.layout
    }

    pub fn active(&self) -> Option<&ConversationId> {
        self.active.as_ref()
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut MessageStore {
        &mut self.store
    }

    /// Loads `conversation_id` and makes it the active conversation.
    ///
    /// On failure the previously active conversation stays open.
    pub async fn open<S: DocumentSource>(
        &mut self,
        source: &S,
        conversation_id: ConversationId,
    ) -> SessionResult<usize> {
        let collection = self.layout.messages_collection(&conversation_id);
        let documents = source
            .fetch_collection(&collection)
            .await
            .context(FetchConversationSnafu {
                stage: "session-open-fetch",
                conversation_id: conversation_id.clone(),
            })?;

        let mut decoded = Vec::with_capacity(documents.len());
        for (position, document) in documents.iter().enumerate() {
            let path = document.path.to_string();
            let id = MessageId::parse(document.id()).context(InvalidMessageIdSnafu {
                stage: "session-open-message-id",
                path: path.clone(),
            })?;
            let body = MessageDocument::from_document(document).context(DecodeMessageSnafu {
                stage: "session-open-decode",
                path,
            })?;
            let seq = body.seq.unwrap_or(u64::MAX);
            decoded.push((seq, position, body.into_message(id)));
        }

        // Explicit `seq` wins; documents without one keep store order at the tail.
        decoded.sort_by_key(|(seq, position, _)| (*seq, *position));
        let messages = decoded
            .into_iter()
            .map(|(_, _, message)| message)
            .collect::<Vec<Message>>();
        let count = messages.len();

        self.close();
        self.store.replace_conversation(conversation_id.clone(), messages);
        tracing::info!("opened conversation {} with {} messages", conversation_id, count);
        self.active = Some(conversation_id);
        Ok(count)
    }

    /// Drops the active conversation from the cache.
    pub fn close(&mut self) {
        if let Some(conversation_id) = self.active.take() {
            self.store.drop_conversation(&conversation_id);
            tracing::debug!("closed conversation {}", conversation_id);
        }
    }
}
