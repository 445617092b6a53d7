pub mod error;
pub mod ids;
pub mod memory;
pub mod sqlite;
pub mod types;

use std::future::Future;

pub use error::{
    IdError, IdResult, RemoteReadError, RemoteReadResult, RemoteWriteError, RemoteWriteResult,
    StorageError, StorageResult, WriteFailureKind,
};
pub use ids::{ConversationId, MessageId, RecordId};
pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;
pub use types::{
    AppendedRecord, Document, DocumentPath, FieldMap, TIMESTAMP_FIELD, merge_fields,
};

/// Write side of the remote document store.
///
/// Implementations never retry; a failed call is reported once and the caller
/// decides what to do with it.
pub trait SyncClient: Send + Sync {
    /// Merges `fields` into the existing document at `path`.
    fn update_fields(
        &self,
        path: &DocumentPath,
        fields: FieldMap,
    ) -> impl Future<Output = RemoteWriteResult<()>> + Send;

    /// Appends a new record to `collection`; the store assigns its id and
    /// [`TIMESTAMP_FIELD`].
    fn append_record(
        &self,
        collection: &DocumentPath,
        record: FieldMap,
    ) -> impl Future<Output = RemoteWriteResult<RecordId>> + Send;
}

/// Read side used to hydrate local caches.
pub trait DocumentSource: Send + Sync {
    /// Lists the documents of `collection` in store order.
    fn fetch_collection(
        &self,
        collection: &DocumentPath,
    ) -> impl Future<Output = RemoteReadResult<Vec<Document>>> + Send;
}
