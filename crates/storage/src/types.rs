use std::fmt;

use serde_json::{Map, Value};

use super::error::IdResult;
use super::ids::{RecordId, validate_segment};

/// Field name the store fills with its own clock on every appended record.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Flat JSON object used for document bodies, partial updates and records.
pub type FieldMap = Map<String, Value>;

/// Slash-separated location inside the document store.
///
/// Paths alternate collection and document segments, so a path with an odd
/// number of segments names a collection and an even one names a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    pub fn collection(name: &str) -> IdResult<Self> {
        validate_segment(name, "collection-name")?;
        Ok(Self {
            segments: vec![name.to_string()],
        })
    }

    pub fn parse(raw: &str) -> IdResult<Self> {
        let mut segments = Vec::new();
        for segment in raw.split('/') {
            validate_segment(segment, "path-segment")?;
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    pub(crate) fn single_validated(segment: String) -> Self {
        Self {
            segments: vec![segment],
        }
    }

    /// Concatenates two already validated paths.
    pub fn join(&self, tail: &DocumentPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(tail.segments.iter().cloned());
        Self { segments }
    }

    pub fn child(&self, segment: &str) -> IdResult<Self> {
        validate_segment(segment, "path-segment")?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    pub fn is_collection(&self) -> bool {
        self.segments.len() % 2 == 1
    }

    pub fn is_document(&self) -> bool {
        !self.segments.is_empty() && self.segments.len() % 2 == 0
    }

    /// Last segment, which is the document id for document paths.
    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Collection that contains this document, or `None` for collection paths.
    pub fn parent_collection(&self) -> Option<Self> {
        if !self.is_document() {
            return None;
        }

        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.segments.join("/"))
    }
}

/// One document as returned by a collection read, in store order.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocumentPath,
    pub fields: FieldMap,
}

impl Document {
    pub fn id(&self) -> &str {
        self.path.leaf()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppendedRecord {
    pub id: RecordId,
    pub collection: DocumentPath,
    pub fields: FieldMap,
}

/// Shallow merge: top-level keys in `patch` overwrite those in `target`.
pub fn merge_fields(target: &mut FieldMap, patch: FieldMap) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}
