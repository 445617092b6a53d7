use lectern_storage::{ConversationId, MessageId, RecordId, WriteFailureKind};

/// Remote operation that produced a [`ListEvent::RemoteWriteFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOperation {
    ToggleLectored,
    SubmitTestCase,
}

/// Notifications the controller hands to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    /// The list switched to another conversation.
    ConversationChanged { conversation_id: ConversationId },
    /// Selected messages in list order.
    SelectionChanged { selected: Vec<MessageId> },
    /// A confirmed lectored flip.
    LectoredChanged { message_id: MessageId, lectored: bool },
    TestCaseSubmitted {
        message_id: MessageId,
        record_id: RecordId,
    },
    /// Local state was left untouched; the user may retry.
    RemoteWriteFailed {
        operation: WriteOperation,
        message_id: MessageId,
        kind: WriteFailureKind,
        reason: String,
    },
}
