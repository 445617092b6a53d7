use lectern_storage::MessageId;

use crate::chat::message::Relevancy;

/// Footprint of the context menu anchored at its top-left corner.
pub const CONTEXT_MENU_WIDTH: f32 = 180.;
pub const CONTEXT_MENU_HEIGHT: f32 = 72.;

/// Pointer position in list coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Entries of the per-message context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuAction {
    AuthorTestCase,
    ToggleSelection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenu {
    pub message_id: MessageId,
    pub position: Point,
}

impl ContextMenu {
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.position.x
            && point.x <= self.position.x + CONTEXT_MENU_WIDTH
            && point.y >= self.position.y
            && point.y <= self.position.y + CONTEXT_MENU_HEIGHT
    }
}

/// Authoring state of a test case that has not been submitted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseDraft {
    pub message_id: MessageId,
    /// Message text captured when authoring started.
    pub message_text: String,
    pub condition: String,
    pub relevancy: Relevancy,
}

impl TestCaseDraft {
    pub fn new(message_id: MessageId, message_text: impl Into<String>) -> Self {
        Self {
            message_id,
            message_text: message_text.into(),
            condition: String::new(),
            relevancy: Relevancy::default(),
        }
    }
}

/// The single overlay the list may show at a time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UiOverlay {
    #[default]
    None,
    ContextMenu(ContextMenu),
    TestCaseModal(TestCaseDraft),
}

impl UiOverlay {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn context_menu(&self) -> Option<&ContextMenu> {
        match self {
            Self::ContextMenu(menu) => Some(menu),
            Self::None | Self::TestCaseModal(_) => None,
        }
    }

    pub fn draft(&self) -> Option<&TestCaseDraft> {
        match self {
            Self::TestCaseModal(draft) => Some(draft),
            Self::None | Self::ContextMenu(_) => None,
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut TestCaseDraft> {
        match self {
            Self::TestCaseModal(draft) => Some(draft),
            Self::None | Self::ContextMenu(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_region_is_inclusive_of_its_edges() {
        let menu = ContextMenu {
            message_id: MessageId::parse("m1").unwrap(),
            position: Point::new(10., 20.),
        };

        assert!(menu.contains(Point::new(10., 20.)));
        assert!(menu.contains(Point::new(10. + CONTEXT_MENU_WIDTH, 20. + CONTEXT_MENU_HEIGHT)));
        assert!(!menu.contains(Point::new(9., 30.)));
        assert!(!menu.contains(Point::new(50., 20. + CONTEXT_MENU_HEIGHT + 1.)));
    }

    #[test]
    fn new_draft_starts_blank_with_normal_relevancy() {
        let draft = TestCaseDraft::new(MessageId::parse("m1").unwrap(), "hello");
        assert!(draft.condition.is_empty());
        assert_eq!(draft.relevancy, Relevancy::Normal);
        assert_eq!(draft.message_text, "hello");
    }
}
