use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use uuid::Uuid;

use super::error::{IdError, IdResult, InvalidDocumentIdSnafu, InvalidRecordIdSnafu};
use super::types::DocumentPath;

// Document ids double as path segments, so every wrapper shares one validation rule.
macro_rules! define_document_id {
    ($name:ident, $id_type:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn parse(raw: &str) -> IdResult<Self> {
                validate_segment(raw, $id_type)?;
                Ok(Self(raw.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(raw: &str) -> IdResult<Self> {
                Self::parse(raw)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(raw: String) -> IdResult<Self> {
                validate_segment(&raw, $id_type)?;
                Ok(Self(raw))
            }
        }

        impl From<&$name> for DocumentPath {
            fn from(value: &$name) -> Self {
                DocumentPath::single_validated(value.0.clone())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

define_document_id!(ConversationId, "conversation-id");
define_document_id!(MessageId, "message-id");

/// Store-assigned identifier of an appended record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new_v7() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn parse(raw: &str) -> IdResult<Self> {
        let parsed = Uuid::parse_str(raw).context(InvalidRecordIdSnafu {
            stage: "parse-record-id",
            raw: raw.to_string(),
        })?;
        Ok(Self(parsed))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = IdError;

    fn from_str(raw: &str) -> IdResult<Self> {
        Self::parse(raw)
    }
}

pub(crate) fn validate_segment(raw: &str, id_type: &'static str) -> IdResult<()> {
    let reason = if raw.is_empty() {
        Some("must not be empty")
    } else if raw.contains('/') {
        Some("must not contain '/'")
    } else if raw.trim() != raw {
        Some("must not carry surrounding whitespace")
    } else {
        None
    };

    match reason {
        Some(reason) => InvalidDocumentIdSnafu {
            stage: "validate-document-id",
            id_type,
            raw: raw.to_string(),
            reason,
        }
        .fail(),
        None => Ok(()),
    }
}
