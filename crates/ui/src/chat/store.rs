use std::collections::{HashMap, HashSet};

use lectern_storage::{ConversationId, MessageId};

use crate::chat::message::{Message, MessagePatch};

/// Authoritative local cache of conversation messages, in arrival order.
///
/// This is a cache, not a query engine: lookups of unknown conversations
/// yield empty results and updates of unknown messages are no-ops.
#[derive(Debug, Default)]
pub struct MessageStore {
    conversations: HashMap<ConversationId, Vec<Message>>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self, conversation_id: &ConversationId) -> &[Message] {
        self.conversations
            .get(conversation_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn message(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) -> Option<&Message> {
        self.messages(conversation_id)
            .iter()
            .find(|message| &message.id == message_id)
    }

    pub fn contains_message(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) -> bool {
        self.message(conversation_id, message_id).is_some()
    }

    pub fn is_loaded(&self, conversation_id: &ConversationId) -> bool {
        self.conversations.contains_key(conversation_id)
    }

    /// Merges `patch` into the matching message. Returns whether one matched.
    pub fn update_message(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        patch: MessagePatch,
    ) -> bool {
        let Some(message) = self
            .conversations
            .get_mut(conversation_id)
            .and_then(|messages| messages.iter_mut().find(|message| &message.id == message_id))
        else {
            return false;
        };

        message.apply_patch(patch);
        true
    }

    /// Replaces the whole conversation. Later duplicates of an id are dropped.
    pub fn replace_conversation(
        &mut self,
        conversation_id: ConversationId,
        messages: Vec<Message>,
    ) {
        let mut seen = HashSet::with_capacity(messages.len());
        let deduplicated = messages
            .into_iter()
            .filter(|message| seen.insert(message.id.clone()))
            .collect();
        self.conversations.insert(conversation_id, deduplicated);
    }

    /// Appends at the tail; ignored when the id is already present.
    pub fn append_message(&mut self, conversation_id: ConversationId, message: Message) -> bool {
        let messages = self.conversations.entry(conversation_id).or_default();
        if messages.iter().any(|existing| existing.id == message.id) {
            return false;
        }

        messages.push(message);
        true
    }

    pub fn remove_message(
        &mut self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) -> Option<Message> {
        let messages = self.conversations.get_mut(conversation_id)?;
        let index = messages.iter().position(|message| &message.id == message_id)?;
        Some(messages.remove(index))
    }

    pub fn drop_conversation(&mut self, conversation_id: &ConversationId) {
        self.conversations.remove(conversation_id);
    }
}
