use std::collections::HashSet;

use lectern_storage::{
    ConversationId, DocumentPath, FieldMap, MessageId, RecordId, RemoteWriteError,
    RemoteWriteResult, SyncClient,
};
use serde_json::Value;

use crate::chat::events::{ListEvent, WriteOperation};
use crate::chat::message::{Message, MessagePatch, Relevancy, TestCaseAnnotation, TranslationMode};
use crate::chat::overlay::{ContextMenu, MenuAction, Point, TestCaseDraft, UiOverlay};
use crate::chat::paths::RemoteLayout;
use crate::chat::selection::SelectionSet;
use crate::chat::store::MessageStore;

/// Counter bumped on every conversation switch.
///
/// Remote completions carry the generation they were issued under, so results
/// that arrive after a switch can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewGeneration(pub u64);

/// Routing key for one in-flight remote write.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WriteTarget {
    pub conversation_id: ConversationId,
    pub generation: ViewGeneration,
}

/// A lectored flip that has been issued but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LectoredWrite {
    pub target: WriteTarget,
    pub message_id: MessageId,
    pub path: DocumentPath,
    pub lectored: bool,
}

impl LectoredWrite {
    pub fn fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("lectored".into(), Value::from(self.lectored));
        fields
    }
}

/// A test-case submission that has been issued but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseSubmission {
    pub target: WriteTarget,
    pub collection: DocumentPath,
    pub annotation: TestCaseAnnotation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleRejection {
    UnknownMessage(MessageId),
    /// A flip of the same message is still waiting for the store.
    WriteInFlight(MessageId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Applied { lectored: bool },
    Failed,
    /// The view moved to another conversation before the write resolved.
    Stale,
    Rejected(ToggleRejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    NoDraft,
    EmptyCondition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(RecordId),
    Failed,
    Stale,
    Rejected(SubmitRejection),
}

/// Render-ready projection of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub message_id: MessageId,
    pub author_id: String,
    pub display_text: String,
    pub has_translation: bool,
    pub lectored: bool,
    pub selected: bool,
    pub write_pending: bool,
}

/// State and workflows of the reviewed message list for one conversation view.
///
/// The controller owns selection, overlay and in-flight bookkeeping. The
/// message cache is borrowed per call because it belongs to the session.
/// Remote writes follow optimistic-after-confirm: the cache changes only once
/// the store has accepted the write.
#[derive(Debug)]
pub struct MessageListController {
    layout: RemoteLayout,
    conversation_id: ConversationId,
    generation: ViewGeneration,
    selection: SelectionSet,
    overlay: UiOverlay,
    translation_mode: TranslationMode,
    lectored_in_flight: HashSet<MessageId>,
    events: Vec<ListEvent>,
}

impl MessageListController {
    pub fn new(layout: RemoteLayout, conversation_id: ConversationId) -> Self {
        Self {
            layout,
            conversation_id,
            generation: ViewGeneration(0),
            selection: SelectionSet::new(),
            overlay: UiOverlay::None,
            translation_mode: TranslationMode::default(),
            lectored_in_flight: HashSet::new(),
            events: Vec::new(),
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn generation(&self) -> ViewGeneration {
        self.generation
    }

    pub fn overlay(&self) -> &UiOverlay {
        &self.overlay
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn translation_mode(&self) -> TranslationMode {
        self.translation_mode
    }

    pub fn is_write_pending(&self, message_id: &MessageId) -> bool {
        self.lectored_in_flight.contains(message_id)
    }

    pub fn drain_events(&mut self) -> Vec<ListEvent> {
        std::mem::take(&mut self.events)
    }

    /// Points the view at another conversation.
    ///
    /// Selection and overlay never carry over. Writes still in flight for the
    /// old conversation are not cancelled; their completions become stale.
    pub fn set_conversation(&mut self, conversation_id: ConversationId) {
        if conversation_id == self.conversation_id {
            return;
        }

        tracing::info!(
            "message list switched from {} to {}",
            self.conversation_id,
            conversation_id
        );
        self.conversation_id = conversation_id.clone();
        self.generation = ViewGeneration(self.generation.0 + 1);
        self.selection.clear();
        self.overlay = UiOverlay::None;
        self.lectored_in_flight.clear();
        self.events.push(ListEvent::ConversationChanged { conversation_id });
        self.events.push(ListEvent::SelectionChanged {
            selected: Vec::new(),
        });
    }

    pub fn toggle_translation_mode(&mut self) -> TranslationMode {
        self.translation_mode = self.translation_mode.toggled();
        self.translation_mode
    }

    pub fn rows(&self, store: &MessageStore) -> Vec<MessageRow> {
        store
            .messages(&self.conversation_id)
            .iter()
            .map(|message| MessageRow {
                message_id: message.id.clone(),
                author_id: message.author_id.clone(),
                display_text: message.display_text(self.translation_mode).to_string(),
                has_translation: message.translation.is_some(),
                lectored: message.lectored,
                selected: self.selection.contains(&message.id),
                write_pending: self.lectored_in_flight.contains(&message.id),
            })
            .collect()
    }

    // Selection

    /// Selected messages in store order.
    pub fn selected_messages<'a>(&self, store: &'a MessageStore) -> Vec<&'a Message> {
        store
            .messages(&self.conversation_id)
            .iter()
            .filter(|message| self.selection.contains(&message.id))
            .collect()
    }

    pub fn selected_ids(&self, store: &MessageStore) -> Vec<MessageId> {
        self.selected_messages(store)
            .into_iter()
            .map(|message| message.id.clone())
            .collect()
    }

    /// Toggles selection of a message of the current conversation.
    /// Returns `None` when the message is not part of it.
    pub fn toggle_selection(
        &mut self,
        store: &MessageStore,
        message_id: &MessageId,
    ) -> Option<bool> {
        if !store.contains_message(&self.conversation_id, message_id) {
            return None;
        }

        let selected = self.selection.toggle(message_id);
        self.emit_selection(store);
        Some(selected)
    }

    pub fn clear_selection(&mut self, store: &MessageStore) {
        if self.selection.is_empty() {
            return;
        }

        self.selection.clear();
        self.emit_selection(store);
    }

    /// Reconciles selection and overlay after the message list changed.
    pub fn sync_with_store(&mut self, store: &MessageStore) {
        let conversation_id = &self.conversation_id;
        let pruned = self
            .selection
            .retain_existing(|id| store.contains_message(conversation_id, id));
        if pruned > 0 {
            tracing::debug!("pruned {} selected messages that no longer exist", pruned);
            self.emit_selection(store);
        }

        let overlay_target = match &self.overlay {
            UiOverlay::ContextMenu(menu) => Some(&menu.message_id),
            UiOverlay::TestCaseModal(draft) => Some(&draft.message_id),
            UiOverlay::None => None,
        };
        if overlay_target.is_some_and(|id| !store.contains_message(&self.conversation_id, id)) {
            self.overlay = UiOverlay::None;
        }
    }

    fn emit_selection(&mut self, store: &MessageStore) {
        let selected = self.selected_ids(store);
        self.events.push(ListEvent::SelectionChanged { selected });
    }

    // Overlay

    /// Opens the context menu for a message, replacing any open overlay.
    pub fn open_context_menu(
        &mut self,
        store: &MessageStore,
        message_id: &MessageId,
        position: Point,
    ) -> bool {
        if !store.contains_message(&self.conversation_id, message_id) {
            return false;
        }

        self.overlay = UiOverlay::ContextMenu(ContextMenu {
            message_id: message_id.clone(),
            position,
        });
        true
    }

    pub fn dismiss_overlay(&mut self) {
        self.overlay = UiOverlay::None;
    }

    /// Closes the context menu when the pointer lands outside of it.
    pub fn pointer_down(&mut self, position: Point) {
        if self
            .overlay
            .context_menu()
            .is_some_and(|menu| !menu.contains(position))
        {
            self.overlay = UiOverlay::None;
        }
    }

    pub fn run_menu_action(&mut self, store: &MessageStore, action: MenuAction) -> bool {
        let Some(message_id) = self.overlay.context_menu().map(|menu| menu.message_id.clone())
        else {
            return false;
        };

        match action {
            MenuAction::AuthorTestCase => self.open_test_case(store, &message_id),
            MenuAction::ToggleSelection => {
                self.overlay = UiOverlay::None;
                self.toggle_selection(store, &message_id).is_some()
            }
        }
    }

    // Lectored

    /// Validates a lectored flip and reserves the message until it resolves.
    pub fn begin_toggle_lectored(
        &mut self,
        store: &MessageStore,
        message_id: &MessageId,
    ) -> Result<LectoredWrite, ToggleRejection> {
        let Some(message) = store.message(&self.conversation_id, message_id) else {
            return Err(ToggleRejection::UnknownMessage(message_id.clone()));
        };
        if self.lectored_in_flight.contains(message_id) {
            return Err(ToggleRejection::WriteInFlight(message_id.clone()));
        }

        self.lectored_in_flight.insert(message_id.clone());
        Ok(LectoredWrite {
            target: self.current_target(),
            message_id: message_id.clone(),
            path: self.layout.message_document(&self.conversation_id, message_id),
            lectored: !message.lectored,
        })
    }

    /// Applies the outcome of a lectored write to the cache.
    pub fn finish_toggle_lectored(
        &mut self,
        store: &mut MessageStore,
        write: LectoredWrite,
        result: RemoteWriteResult<()>,
    ) -> ToggleOutcome {
        if !self.is_current(&write.target) {
            match &result {
                Ok(()) => tracing::debug!(
                    "dropping stale lectored confirmation for {} in {}",
                    write.message_id,
                    write.target.conversation_id
                ),
                Err(error) => tracing::warn!(
                    "stale lectored write for {} in {} failed: {}",
                    write.message_id,
                    write.target.conversation_id,
                    error
                ),
            }
            return ToggleOutcome::Stale;
        }

        self.lectored_in_flight.remove(&write.message_id);
        match result {
            Ok(()) => {
                store.update_message(
                    &write.target.conversation_id,
                    &write.message_id,
                    MessagePatch::lectored(write.lectored),
                );
                tracing::info!(
                    "message {} marked lectored={}",
                    write.message_id,
                    write.lectored
                );
                self.events.push(ListEvent::LectoredChanged {
                    message_id: write.message_id,
                    lectored: write.lectored,
                });
                ToggleOutcome::Applied {
                    lectored: write.lectored,
                }
            }
            Err(error) => {
                self.report_write_failure(WriteOperation::ToggleLectored, write.message_id, &error);
                ToggleOutcome::Failed
            }
        }
    }

    /// Flips the lectored flag of a message through the remote store.
    pub async fn toggle_lectored<C: SyncClient>(
        &mut self,
        store: &mut MessageStore,
        client: &C,
        message_id: &MessageId,
    ) -> ToggleOutcome {
        let write = match self.begin_toggle_lectored(store, message_id) {
            Ok(write) => write,
            Err(rejection) => {
                tracing::debug!("lectored toggle rejected: {:?}", rejection);
                return ToggleOutcome::Rejected(rejection);
            }
        };

        let result = client.update_fields(&write.path, write.fields()).await;
        self.finish_toggle_lectored(store, write, result)
    }

    // Test cases

    /// Starts authoring a test case for a message, replacing any open overlay.
    pub fn open_test_case(&mut self, store: &MessageStore, message_id: &MessageId) -> bool {
        let Some(message) = store.message(&self.conversation_id, message_id) else {
            return false;
        };

        self.overlay = UiOverlay::TestCaseModal(TestCaseDraft::new(
            message_id.clone(),
            message.text.clone(),
        ));
        true
    }

    pub fn set_condition(&mut self, condition: impl Into<String>) -> bool {
        match self.overlay.draft_mut() {
            Some(draft) => {
                draft.condition = condition.into();
                true
            }
            None => false,
        }
    }

    pub fn set_relevancy(&mut self, relevancy: Relevancy) -> bool {
        match self.overlay.draft_mut() {
            Some(draft) => {
                draft.relevancy = relevancy;
                true
            }
            None => false,
        }
    }

    /// Snapshots the open draft into an annotation ready to append.
    /// The draft stays open until the append resolves.
    pub fn begin_submit_test_case(&self) -> Result<TestCaseSubmission, SubmitRejection> {
        let draft = self.overlay.draft().ok_or(SubmitRejection::NoDraft)?;
        let condition = draft.condition.trim();
        if condition.is_empty() {
            return Err(SubmitRejection::EmptyCondition);
        }

        Ok(TestCaseSubmission {
            target: self.current_target(),
            collection: self.layout.testcases_collection().clone(),
            annotation: TestCaseAnnotation {
                message_id: draft.message_id.clone(),
                conversation_id: self.conversation_id.clone(),
                condition: condition.to_string(),
                relevancy: draft.relevancy,
                message_text: draft.message_text.clone(),
            },
        })
    }

    pub fn finish_submit_test_case(
        &mut self,
        submission: TestCaseSubmission,
        result: RemoteWriteResult<RecordId>,
    ) -> SubmitOutcome {
        let message_id = submission.annotation.message_id;
        if !self.is_current(&submission.target) {
            if let Err(error) = &result {
                tracing::warn!("stale test case submission for {} failed: {}", message_id, error);
            }
            return SubmitOutcome::Stale;
        }

        match result {
            Ok(record_id) => {
                // Only close the modal that produced this submission.
                if self
                    .overlay
                    .draft()
                    .is_some_and(|draft| draft.message_id == message_id)
                {
                    self.overlay = UiOverlay::None;
                }
                tracing::info!("stored test case {} for message {}", record_id, message_id);
                self.events.push(ListEvent::TestCaseSubmitted {
                    message_id,
                    record_id,
                });
                SubmitOutcome::Submitted(record_id)
            }
            Err(error) => {
                self.report_write_failure(WriteOperation::SubmitTestCase, message_id, &error);
                SubmitOutcome::Failed
            }
        }
    }

    /// Appends the open draft to the test-case collection.
    pub async fn submit_test_case<C: SyncClient>(&mut self, client: &C) -> SubmitOutcome {
        let submission = match self.begin_submit_test_case() {
            Ok(submission) => submission,
            Err(rejection) => return SubmitOutcome::Rejected(rejection),
        };

        let record = submission.annotation.clone().into_record();
        let result = client.append_record(&submission.collection, record).await;
        self.finish_submit_test_case(submission, result)
    }

    fn current_target(&self) -> WriteTarget {
        WriteTarget {
            conversation_id: self.conversation_id.clone(),
            generation: self.generation,
        }
    }

    fn is_current(&self, target: &WriteTarget) -> bool {
        target.generation == self.generation && target.conversation_id == self.conversation_id
    }

    fn report_write_failure(
        &mut self,
        operation: WriteOperation,
        message_id: MessageId,
        error: &RemoteWriteError,
    ) {
        tracing::warn!(
            "remote write {:?} for message {} failed at {}: {}",
            operation,
            message_id,
            error.stage(),
            error
        );
        self.events.push(ListEvent::RemoteWriteFailed {
            operation,
            message_id,
            kind: error.kind(),
            reason: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use lectern_storage::{MemoryDocumentStore, WriteFailureKind};
    use serde_json::json;

    use super::*;
    use crate::chat::message::PersistedTestCase;

    fn conversation(raw: &str) -> ConversationId {
        ConversationId::parse(raw).unwrap()
    }

    fn id(raw: &str) -> MessageId {
        MessageId::parse(raw).unwrap()
    }

    struct Fixture {
        layout: RemoteLayout,
        remote: MemoryDocumentStore,
        store: MessageStore,
        controller: MessageListController,
    }

    /// Conversation `c1` with messages m1..m3 mirrored locally and remotely.
    fn fixture() -> Fixture {
        let layout = RemoteLayout::with_defaults().unwrap();
        let remote = MemoryDocumentStore::new();
        let mut store = MessageStore::new();
        let mut messages = Vec::new();

        for (raw, text) in [("m1", "Guten Morgen"), ("m2", "Wie geht's?"), ("m3", "Tschüss")] {
            let message = Message::new(id(raw), "tutor", text);
            let body = json!({"authorId": "tutor", "text": text, "lectored": false});
            remote.insert_document(
                layout.message_document(&conversation("c1"), &message.id),
                body.as_object().cloned().unwrap(),
            );
            messages.push(message);
        }
        store.replace_conversation(conversation("c1"), messages);

        let controller = MessageListController::new(layout.clone(), conversation("c1"));
        Fixture {
            layout,
            remote,
            store,
            controller,
        }
    }

    fn lectored(store: &MessageStore, conversation_raw: &str, raw: &str) -> bool {
        store
            .message(&conversation(conversation_raw), &id(raw))
            .map(|message| message.lectored)
            .unwrap()
    }

    fn expected_projection(fixture: &Fixture) -> Vec<MessageId> {
        fixture
            .store
            .messages(&conversation("c1"))
            .iter()
            .filter(|message| fixture.controller.selection().contains(&message.id))
            .map(|message| message.id.clone())
            .collect()
    }

    #[tokio::test]
    async fn confirmed_toggle_negates_flag_once_locally_and_remotely() {
        let mut f = fixture();

        let outcome = f
            .controller
            .toggle_lectored(&mut f.store, &f.remote, &id("m2"))
            .await;

        assert_eq!(outcome, ToggleOutcome::Applied { lectored: true });
        assert!(lectored(&f.store, "c1", "m2"));
        assert!(!lectored(&f.store, "c1", "m1"));
        let remote_doc = f
            .remote
            .document(&f.layout.message_document(&conversation("c1"), &id("m2")))
            .unwrap();
        assert_eq!(remote_doc.get("lectored"), Some(&json!(true)));
        assert!(f.controller.drain_events().contains(&ListEvent::LectoredChanged {
            message_id: id("m2"),
            lectored: true,
        }));

        let outcome = f
            .controller
            .toggle_lectored(&mut f.store, &f.remote, &id("m2"))
            .await;
        assert_eq!(outcome, ToggleOutcome::Applied { lectored: false });
        assert!(!lectored(&f.store, "c1", "m2"));
    }

    #[tokio::test]
    async fn failed_toggle_leaves_cache_untouched_and_reports() {
        let mut f = fixture();
        f.remote.fail_next_write(WriteFailureKind::Permission, "reviewer role required");

        let outcome = f
            .controller
            .toggle_lectored(&mut f.store, &f.remote, &id("m1"))
            .await;

        assert_eq!(outcome, ToggleOutcome::Failed);
        assert!(!lectored(&f.store, "c1", "m1"));
        assert!(!f.controller.is_write_pending(&id("m1")));
        let events = f.controller.drain_events();
        assert!(matches!(
            events.as_slice(),
            [ListEvent::RemoteWriteFailed {
                operation: WriteOperation::ToggleLectored,
                kind: WriteFailureKind::Permission,
                ..
            }]
        ));

        // Manual retry succeeds once the store accepts the write.
        let retry = f
            .controller
            .toggle_lectored(&mut f.store, &f.remote, &id("m1"))
            .await;
        assert_eq!(retry, ToggleOutcome::Applied { lectored: true });
    }

    #[test]
    fn second_toggle_is_rejected_while_first_is_in_flight() {
        let mut f = fixture();
        let first = f.controller.begin_toggle_lectored(&f.store, &id("m1")).unwrap();

        let second = f.controller.begin_toggle_lectored(&f.store, &id("m1"));
        assert_eq!(second, Err(ToggleRejection::WriteInFlight(id("m1"))));
        assert!(f.controller.rows(&f.store)[0].write_pending);

        let outcome = f.controller.finish_toggle_lectored(&mut f.store, first, Ok(()));
        assert_eq!(outcome, ToggleOutcome::Applied { lectored: true });

        let third = f.controller.begin_toggle_lectored(&f.store, &id("m1")).unwrap();
        assert!(!third.lectored);
    }

    #[test]
    fn unknown_message_cannot_be_toggled() {
        let mut f = fixture();
        assert_eq!(
            f.controller.begin_toggle_lectored(&f.store, &id("ghost")),
            Err(ToggleRejection::UnknownMessage(id("ghost")))
        );
    }

    #[test]
    fn late_confirmation_after_conversation_switch_is_dropped() {
        let mut f = fixture();
        let write = f.controller.begin_toggle_lectored(&f.store, &id("m1")).unwrap();

        f.store
            .replace_conversation(conversation("c2"), vec![Message::new(id("m1"), "tutor", "Hi")]);
        f.controller.set_conversation(conversation("c2"));

        let outcome = f.controller.finish_toggle_lectored(&mut f.store, write, Ok(()));

        assert_eq!(outcome, ToggleOutcome::Stale);
        assert!(!lectored(&f.store, "c1", "m1"));
        assert!(!lectored(&f.store, "c2", "m1"));
    }

    #[test]
    fn late_confirmation_after_switching_back_is_still_dropped() {
        let mut f = fixture();
        let write = f.controller.begin_toggle_lectored(&f.store, &id("m1")).unwrap();

        f.controller.set_conversation(conversation("c2"));
        f.controller.set_conversation(conversation("c1"));
        let fresh = f.controller.begin_toggle_lectored(&f.store, &id("m1")).unwrap();

        let outcome = f.controller.finish_toggle_lectored(&mut f.store, write, Ok(()));
        assert_eq!(outcome, ToggleOutcome::Stale);
        assert!(!lectored(&f.store, "c1", "m1"));
        // The stale completion must not release the fresh reservation.
        assert!(f.controller.is_write_pending(&id("m1")));

        let outcome = f.controller.finish_toggle_lectored(&mut f.store, fresh, Ok(()));
        assert_eq!(outcome, ToggleOutcome::Applied { lectored: true });
    }

    #[test]
    fn conversation_switch_empties_selection_and_projection() {
        let mut f = fixture();
        f.controller.toggle_selection(&f.store, &id("m1"));
        f.controller.toggle_selection(&f.store, &id("m3"));
        f.controller.drain_events();

        f.controller.set_conversation(conversation("c2"));

        assert!(f.controller.selection().is_empty());
        assert!(f.controller.selected_messages(&f.store).is_empty());
        assert_eq!(
            f.controller.drain_events(),
            vec![
                ListEvent::ConversationChanged {
                    conversation_id: conversation("c2"),
                },
                ListEvent::SelectionChanged {
                    selected: Vec::new(),
                },
            ]
        );
    }

    #[test]
    fn switching_to_the_same_conversation_keeps_selection() {
        let mut f = fixture();
        f.controller.toggle_selection(&f.store, &id("m1"));
        f.controller.set_conversation(conversation("c1"));
        assert_eq!(f.controller.selected_ids(&f.store), vec![id("m1")]);
    }

    #[test]
    fn projection_follows_store_order_through_interleaved_updates() {
        let mut f = fixture();

        f.controller.toggle_selection(&f.store, &id("m3"));
        f.controller.toggle_selection(&f.store, &id("m1"));
        assert_eq!(f.controller.selected_ids(&f.store), vec![id("m1"), id("m3")]);
        assert_eq!(f.controller.selected_ids(&f.store), expected_projection(&f));

        f.store
            .append_message(conversation("c1"), Message::new(id("a0"), "student", "Danke"));
        f.controller.toggle_selection(&f.store, &id("a0"));
        assert_eq!(
            f.controller.selected_ids(&f.store),
            vec![id("m1"), id("m3"), id("a0")]
        );
        assert_eq!(f.controller.selected_ids(&f.store), expected_projection(&f));

        f.store.remove_message(&conversation("c1"), &id("m3"));
        f.controller.sync_with_store(&f.store);
        assert!(!f.controller.selection().contains(&id("m3")));
        assert_eq!(f.controller.selected_ids(&f.store), vec![id("m1"), id("a0")]);
        assert_eq!(f.controller.selected_ids(&f.store), expected_projection(&f));

        f.controller.toggle_selection(&f.store, &id("m1"));
        assert_eq!(f.controller.selected_ids(&f.store), expected_projection(&f));

        let last = f.controller.drain_events().pop();
        assert_eq!(
            last,
            Some(ListEvent::SelectionChanged {
                selected: vec![id("a0")],
            })
        );
    }

    #[test]
    fn selecting_a_foreign_message_is_ignored() {
        let mut f = fixture();
        assert_eq!(f.controller.toggle_selection(&f.store, &id("ghost")), None);
        assert!(f.controller.drain_events().is_empty());
    }

    #[tokio::test]
    async fn successful_submission_appends_record_and_closes_modal() {
        let mut f = fixture();
        assert!(f.controller.open_test_case(&f.store, &id("m2")));
        assert_eq!(f.controller.overlay().draft().unwrap().relevancy, Relevancy::Normal);
        f.controller.set_condition("  asks about wellbeing  ");

        let outcome = f.controller.submit_test_case(&f.remote).await;

        let SubmitOutcome::Submitted(record_id) = outcome else {
            panic!("expected submission, got {outcome:?}");
        };
        assert_eq!(f.controller.overlay(), &UiOverlay::None);

        let records = f.remote.records(f.layout.testcases_collection());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, record_id);
        let persisted = PersistedTestCase::from_fields(&records[0].fields).unwrap();
        assert_eq!(persisted.message_id, id("m2"));
        assert_eq!(persisted.conversation_id, conversation("c1"));
        assert_eq!(persisted.condition, "asks about wellbeing");
        assert_eq!(persisted.relevancy, Relevancy::Normal);
        assert_eq!(persisted.message_text, "Wie geht's?");
    }

    #[tokio::test]
    async fn failed_submission_keeps_modal_and_input() {
        let mut f = fixture();
        f.controller.open_test_case(&f.store, &id("m1"));
        f.controller.set_condition("greets in the morning");
        f.controller.set_relevancy(Relevancy::Important);
        f.remote.fail_next_write(WriteFailureKind::Network, "connection reset");

        let outcome = f.controller.submit_test_case(&f.remote).await;

        assert_eq!(outcome, SubmitOutcome::Failed);
        let draft = f.controller.overlay().draft().unwrap();
        assert_eq!(draft.condition, "greets in the morning");
        assert_eq!(draft.relevancy, Relevancy::Important);
        assert!(f.remote.records(f.layout.testcases_collection()).is_empty());

        let retry = f.controller.submit_test_case(&f.remote).await;
        assert!(matches!(retry, SubmitOutcome::Submitted(_)));
        let records = f.remote.records(f.layout.testcases_collection());
        let persisted = PersistedTestCase::from_fields(&records[0].fields).unwrap();
        assert_eq!(persisted.relevancy, Relevancy::Important);
    }

    #[tokio::test]
    async fn blank_condition_is_rejected_before_any_remote_call() {
        let mut f = fixture();
        assert_eq!(
            f.controller.submit_test_case(&f.remote).await,
            SubmitOutcome::Rejected(SubmitRejection::NoDraft)
        );

        f.controller.open_test_case(&f.store, &id("m1"));
        f.controller.set_condition("   ");
        assert_eq!(
            f.controller.submit_test_case(&f.remote).await,
            SubmitOutcome::Rejected(SubmitRejection::EmptyCondition)
        );
        assert_eq!(f.remote.write_attempts(), 0);
        assert!(f.controller.overlay().draft().is_some());
    }

    #[test]
    fn stale_submission_does_not_touch_new_view() {
        let mut f = fixture();
        f.controller.open_test_case(&f.store, &id("m1"));
        f.controller.set_condition("greets");
        let submission = f.controller.begin_submit_test_case().unwrap();

        f.controller.set_conversation(conversation("c2"));
        let outcome = f
            .controller
            .finish_submit_test_case(submission, Ok(lectern_storage::RecordId::new_v7()));

        assert_eq!(outcome, SubmitOutcome::Stale);
        assert!(f
            .controller
            .drain_events()
            .iter()
            .all(|event| !matches!(event, ListEvent::TestCaseSubmitted { .. })));
    }

    #[test]
    fn only_one_overlay_is_open_at_a_time() {
        let mut f = fixture();
        assert!(f.controller.open_context_menu(&f.store, &id("m1"), Point::new(5., 5.)));
        assert!(f.controller.open_context_menu(&f.store, &id("m2"), Point::new(40., 40.)));
        assert_eq!(
            f.controller.overlay().context_menu().map(|menu| menu.message_id.clone()),
            Some(id("m2"))
        );

        assert!(f.controller.run_menu_action(&f.store, MenuAction::AuthorTestCase));
        assert!(f.controller.overlay().context_menu().is_none());
        assert_eq!(f.controller.overlay().draft().unwrap().message_id, id("m2"));
    }

    #[test]
    fn pointer_down_outside_menu_dismisses_it() {
        let mut f = fixture();
        f.controller.open_context_menu(&f.store, &id("m1"), Point::new(100., 100.));

        f.controller.pointer_down(Point::new(120., 130.));
        assert!(f.controller.overlay().is_open());

        f.controller.pointer_down(Point::new(10., 10.));
        assert!(!f.controller.overlay().is_open());
    }

    #[test]
    fn menu_selection_action_closes_menu_and_selects() {
        let mut f = fixture();
        f.controller.open_context_menu(&f.store, &id("m3"), Point::default());

        assert!(f.controller.run_menu_action(&f.store, MenuAction::ToggleSelection));

        assert!(!f.controller.overlay().is_open());
        assert_eq!(f.controller.selected_ids(&f.store), vec![id("m3")]);
    }

    #[test]
    fn rows_follow_translation_mode_and_selection() {
        let mut f = fixture();
        f.store.update_message(
            &conversation("c1"),
            &id("m1"),
            MessagePatch {
                translation: Some(Some("Good morning".to_string())),
                ..MessagePatch::default()
            },
        );
        f.controller.toggle_selection(&f.store, &id("m1"));

        let rows = f.controller.rows(&f.store);
        assert_eq!(rows[0].display_text, "Guten Morgen");
        assert!(rows[0].has_translation);
        assert!(rows[0].selected);
        assert!(!rows[1].selected);

        assert_eq!(f.controller.toggle_translation_mode(), TranslationMode::Translated);
        let rows = f.controller.rows(&f.store);
        assert_eq!(rows[0].display_text, "Good morning");
        assert_eq!(rows[1].display_text, "Wie geht's?");
    }
}
