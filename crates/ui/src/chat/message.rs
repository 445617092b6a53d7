use std::fmt;

use lectern_storage::{ConversationId, Document, FieldMap, MessageId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which text the list shows for messages that carry a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TranslationMode {
    #[default]
    Original,
    Translated,
}

impl TranslationMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Original => Self::Translated,
            Self::Translated => Self::Original,
        }
    }
}

/// One chat message as cached by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub author_id: String,
    pub text: String,
    pub translation: Option<String>,
    pub lectored: bool,
}

impl Message {
    pub fn new(id: MessageId, author_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            author_id: author_id.into(),
            text: text.into(),
            translation: None,
            lectored: false,
        }
    }

    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = Some(translation.into());
        self
    }

    pub fn with_lectored(mut self, lectored: bool) -> Self {
        self.lectored = lectored;
        self
    }

    /// Text to show under `mode`, falling back to the original when no
    /// translation exists.
    pub fn display_text(&self, mode: TranslationMode) -> &str {
        match (mode, self.translation.as_deref()) {
            (TranslationMode::Translated, Some(translation)) if !translation.trim().is_empty() => {
                translation
            }
            _ => &self.text,
        }
    }

    pub fn apply_patch(&mut self, patch: MessagePatch) {
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(translation) = patch.translation {
            self.translation = translation;
        }
        if let Some(lectored) = patch.lectored {
            self.lectored = lectored;
        }
    }
}

/// Partial message fields merged by [`super::store::MessageStore::update_message`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessagePatch {
    pub text: Option<String>,
    /// `Some(None)` clears the translation.
    pub translation: Option<Option<String>>,
    pub lectored: Option<bool>,
}

impl MessagePatch {
    pub fn lectored(value: bool) -> Self {
        Self {
            lectored: Some(value),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.translation.is_none() && self.lectored.is_none()
    }
}

/// Wire shape of a message document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageDocument {
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub lectored: bool,
    #[serde(default)]
    pub seq: Option<u64>,
}

impl MessageDocument {
    pub(crate) fn from_document(document: &Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(document.fields.clone()))
    }

    pub(crate) fn into_message(self, id: MessageId) -> Message {
        Message {
            id,
            author_id: self.author_id,
            text: self.text,
            translation: self.translation,
            lectored: self.lectored,
        }
    }
}

/// Importance tag attached to a test-case annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relevancy {
    Note,
    #[default]
    Normal,
    Important,
}

impl Relevancy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Normal => "normal",
            Self::Important => "important",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "note" => Some(Self::Note),
            "normal" => Some(Self::Normal),
            "important" => Some(Self::Important),
            _ => None,
        }
    }
}

impl fmt::Display for Relevancy {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Reviewer note about one message, appended to the test-case collection.
///
/// The store assigns `timestamp` when the record lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseAnnotation {
    pub message_id: MessageId,
    pub conversation_id: ConversationId,
    pub condition: String,
    pub relevancy: Relevancy,
    pub message_text: String,
}

impl TestCaseAnnotation {
    pub fn into_record(self) -> FieldMap {
        let mut record = FieldMap::new();
        record.insert("messageId".into(), Value::from(String::from(self.message_id)));
        record.insert(
            "conversationId".into(),
            Value::from(String::from(self.conversation_id)),
        );
        record.insert("condition".into(), Value::from(self.condition));
        record.insert("relevancy".into(), Value::from(self.relevancy.as_str()));
        record.insert("messageText".into(), Value::from(self.message_text));
        record
    }
}

/// A test-case record as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTestCase {
    pub message_id: MessageId,
    pub conversation_id: ConversationId,
    pub condition: String,
    pub relevancy: Relevancy,
    pub timestamp: u64,
    pub message_text: String,
}

impl PersistedTestCase {
    pub fn from_fields(fields: &FieldMap) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(fields.clone()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn message_id(raw: &str) -> MessageId {
        MessageId::parse(raw).unwrap()
    }

    #[test]
    fn display_text_prefers_non_blank_translation_only_when_translated() {
        let plain = Message::new(message_id("m1"), "alice", "Hallo");
        let translated = plain.clone().with_translation("Hello");
        let blank = plain.clone().with_translation("  ");

        assert_eq!(plain.display_text(TranslationMode::Translated), "Hallo");
        assert_eq!(translated.display_text(TranslationMode::Original), "Hallo");
        assert_eq!(translated.display_text(TranslationMode::Translated), "Hello");
        assert_eq!(blank.display_text(TranslationMode::Translated), "Hallo");
    }

    #[test]
    fn patch_touches_only_provided_fields() {
        let mut message = Message::new(message_id("m1"), "alice", "Hallo").with_translation("Hello");

        message.apply_patch(MessagePatch::lectored(true));
        assert!(message.lectored);
        assert_eq!(message.translation.as_deref(), Some("Hello"));

        message.apply_patch(MessagePatch {
            translation: Some(None),
            ..MessagePatch::default()
        });
        assert_eq!(message.translation, None);
        assert_eq!(message.text, "Hallo");
    }

    #[test]
    fn relevancy_defaults_to_normal_and_serializes_lowercase() {
        assert_eq!(Relevancy::default(), Relevancy::Normal);
        assert_eq!(serde_json::to_value(Relevancy::Important).unwrap(), json!("important"));
        assert_eq!(Relevancy::parse(" Note "), Some(Relevancy::Note));
        assert_eq!(Relevancy::parse("urgent"), None);
    }

    #[test]
    fn annotation_record_uses_wire_field_names() {
        let annotation = TestCaseAnnotation {
            message_id: message_id("m1"),
            conversation_id: ConversationId::parse("c1").unwrap(),
            condition: "replies politely".to_string(),
            relevancy: Relevancy::Note,
            message_text: "Hallo".to_string(),
        };

        let record = annotation.into_record();
        assert_eq!(
            Value::Object(record),
            json!({
                "messageId": "m1",
                "conversationId": "c1",
                "condition": "replies politely",
                "relevancy": "note",
                "messageText": "Hallo",
            })
        );
    }
}
