use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use super::error::{
    MissingDocumentSnafu, RejectedSnafu, RemoteReadResult, RemoteWriteResult, UnavailableSnafu,
    WriteFailureKind,
};
use super::ids::RecordId;
use super::types::{
    AppendedRecord, Document, DocumentPath, FieldMap, TIMESTAMP_FIELD, merge_fields,
};
use super::{DocumentSource, SyncClient};

#[derive(Debug)]
struct StoredDocument {
    seq: u64,
    path: DocumentPath,
    fields: FieldMap,
}

#[derive(Debug, Default)]
struct MemoryState {
    documents: HashMap<String, StoredDocument>,
    records: Vec<AppendedRecord>,
    next_seq: u64,
    scripted_write_failures: VecDeque<(WriteFailureKind, String)>,
    read_failure: Option<String>,
    write_attempts: usize,
}

/// Process-local document store.
///
/// Keeps documents in insertion order and lets callers script failures so the
/// error paths of a client can be driven deterministically.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    state: Mutex<MemoryState>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces the document at `path`. Replacing keeps its position.
    pub fn insert_document(&self, path: DocumentPath, fields: FieldMap) {
        let mut state = self.state();
        let key = path.to_string();
        if let Some(existing) = state.documents.get_mut(&key) {
            existing.fields = fields;
            return;
        }

        state.next_seq += 1;
        let seq = state.next_seq;
        state
            .documents
            .insert(key, StoredDocument { seq, path, fields });
    }

    pub fn document(&self, path: &DocumentPath) -> Option<FieldMap> {
        self.state()
            .documents
            .get(&path.to_string())
            .map(|document| document.fields.clone())
    }

    pub fn records(&self, collection: &DocumentPath) -> Vec<AppendedRecord> {
        self.state()
            .records
            .iter()
            .filter(|record| &record.collection == collection)
            .cloned()
            .collect()
    }

    /// Makes the next write (update or append) fail with `kind`.
    pub fn fail_next_write(&self, kind: WriteFailureKind, details: impl Into<String>) {
        self.state()
            .scripted_write_failures
            .push_back((kind, details.into()));
    }

    /// Makes every read fail until [`Self::restore_reads`] is called.
    pub fn fail_reads(&self, details: impl Into<String>) {
        self.state().read_failure = Some(details.into());
    }

    pub fn restore_reads(&self) {
        self.state().read_failure = None;
    }

    /// Number of write calls received, failed ones included.
    pub fn write_attempts(&self) -> usize {
        self.state().write_attempts
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        // State stays consistent across a panicking test thread; reuse it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemoryState {
    fn take_scripted_failure(
        &mut self,
        path: &DocumentPath,
        stage: &'static str,
    ) -> RemoteWriteResult<()> {
        self.write_attempts += 1;
        match self.scripted_write_failures.pop_front() {
            Some((kind, details)) => RejectedSnafu {
                stage,
                path: path.to_string(),
                kind,
                details,
            }
            .fail(),
            None => Ok(()),
        }
    }
}

impl SyncClient for MemoryDocumentStore {
    async fn update_fields(&self, path: &DocumentPath, fields: FieldMap) -> RemoteWriteResult<()> {
        let mut state = self.state();
        state.take_scripted_failure(path, "memory-update-scripted")?;

        if !path.is_document() {
            return RejectedSnafu {
                stage: "memory-update-validate-path",
                path: path.to_string(),
                kind: WriteFailureKind::Validation,
                details: "field updates must target a document".to_string(),
            }
            .fail();
        }

        let Some(document) = state.documents.get_mut(&path.to_string()) else {
            return MissingDocumentSnafu {
                stage: "memory-update-load",
                path: path.to_string(),
            }
            .fail();
        };

        merge_fields(&mut document.fields, fields);
        tracing::debug!("memory store updated {}", path);
        Ok(())
    }

    async fn append_record(
        &self,
        collection: &DocumentPath,
        mut record: FieldMap,
    ) -> RemoteWriteResult<RecordId> {
        let mut state = self.state();
        state.take_scripted_failure(collection, "memory-append-scripted")?;

        if !collection.is_collection() {
            return RejectedSnafu {
                stage: "memory-append-validate-path",
                path: collection.to_string(),
                kind: WriteFailureKind::Validation,
                details: "records must be appended to a collection".to_string(),
            }
            .fail();
        }

        let id = RecordId::new_v7();
        record.insert(TIMESTAMP_FIELD.to_string(), Value::from(unix_timestamp_seconds()));
        state.records.push(AppendedRecord {
            id,
            collection: collection.clone(),
            fields: record,
        });
        tracing::debug!("memory store appended record {} to {}", id, collection);
        Ok(id)
    }
}

impl DocumentSource for MemoryDocumentStore {
    async fn fetch_collection(&self, collection: &DocumentPath) -> RemoteReadResult<Vec<Document>> {
        let state = self.state();
        if let Some(details) = &state.read_failure {
            return UnavailableSnafu {
                stage: "memory-fetch-scripted",
                collection: collection.to_string(),
                details: details.clone(),
            }
            .fail();
        }

        let mut matching = state
            .documents
            .values()
            .filter(|document| document.path.parent_collection().as_ref() == Some(collection))
            .collect::<Vec<_>>();
        matching.sort_by_key(|document| document.seq);

        Ok(matching
            .into_iter()
            .map(|document| Document {
                path: document.path.clone(),
                fields: document.fields.clone(),
            })
            .collect())
    }
}

fn unix_timestamp_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}
