/// Message list workflows: lectored toggle, selection, test-case authoring.
pub mod controller;
/// Event contracts handed to the rendering layer.
pub mod events;
/// Domain entities and wire shapes.
pub mod message;
pub mod overlay;
pub mod paths;
pub mod selection;
pub mod session;
pub mod store;

pub use controller::{
    LectoredWrite, MessageListController, MessageRow, SubmitOutcome, SubmitRejection,
    TestCaseSubmission, ToggleOutcome, ToggleRejection, ViewGeneration, WriteTarget,
};
pub use events::{ListEvent, WriteOperation};
pub use message::{
    Message, MessagePatch, PersistedTestCase, Relevancy, TestCaseAnnotation, TranslationMode,
};
pub use overlay::{ContextMenu, MenuAction, Point, TestCaseDraft, UiOverlay};
pub use paths::RemoteLayout;
pub use selection::SelectionSet;
pub use session::{ChatSession, SessionError, SessionResult};
pub use store::MessageStore;
