use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use snafu::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};

use super::error::{
    CreateSqliteDirectorySnafu, DecodeDocumentSnafu, DecodeStoredFieldsSnafu, EncodeFieldsSnafu,
    InvalidStoredPathSnafu, MissingDocumentSnafu, RejectedSnafu, RemoteReadResult,
    RemoteWriteResult, SqliteConnectOptionsSnafu, SqliteConnectSnafu, SqliteMigrateSnafu,
    SqlitePragmaSnafu, SqliteReadSnafu, SqliteWriteSnafu, StorageResult, WriteFailureKind,
};
use super::ids::RecordId;
use super::types::{
    AppendedRecord, Document, DocumentPath, FieldMap, TIMESTAMP_FIELD, merge_fields,
};
use super::{DocumentSource, SyncClient};

/// Document store persisted in a local SQLite database.
///
/// Documents live in one table keyed by their full path, with the JSON body
/// stored as text. Appended records get their own table and a server-side
/// timestamp.
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

#[derive(Debug, FromRow)]
struct DocumentRow {
    path: String,
    fields_json: String,
}

#[derive(Debug, FromRow)]
struct RecordRow {
    id: String,
    fields_json: String,
}

impl SqliteDocumentStore {
    pub async fn open(database_location: &str) -> StorageResult<Self> {
        ensure_database_directory(database_location)?;

        let database_url = normalize_database_url(database_location);
        let connect_options = SqliteConnectOptions::from_str(&database_url)
            .context(SqliteConnectOptionsSnafu {
                stage: "sqlite-open-parse-url",
                database_url: database_url.clone(),
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_millis(5_000));

        // One connection keeps in-memory databases alive and serializes writers.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await
            .context(SqliteConnectSnafu {
                stage: "sqlite-open-connect",
                database_url: database_url.clone(),
            })?;

        sqlx::query("PRAGMA busy_timeout = 5000;")
            .execute(&pool)
            .await
            .context(SqlitePragmaSnafu {
                stage: "sqlite-open-pragma-busy-timeout",
                pragma: "busy_timeout",
            })?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context(SqliteMigrateSnafu {
                stage: "sqlite-open-migrate",
            })?;

        tracing::info!("opened document store at {}", database_url);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates or replaces the document at `path`. Replacing keeps its position.
    pub async fn put_document(
        &self,
        path: &DocumentPath,
        fields: &FieldMap,
    ) -> RemoteWriteResult<()> {
        let Some(collection) = path.parent_collection() else {
            return RejectedSnafu {
                stage: "sqlite-put-validate-path",
                path: path.to_string(),
                kind: WriteFailureKind::Validation,
                details: "documents must live inside a collection".to_string(),
            }
            .fail();
        };

        let fields_json = serde_json::to_string(fields).context(EncodeFieldsSnafu {
            stage: "sqlite-put-encode",
            path: path.to_string(),
        })?;
        let now = unix_timestamp_seconds();

        sqlx::query(
            "INSERT INTO documents (path, collection, document_id, seq, fields_json, created_at, updated_at) \
             VALUES (?, ?, ?, (SELECT COALESCE(MAX(seq), 0) + 1 FROM documents), ?, ?, ?) \
             ON CONFLICT(path) DO UPDATE SET fields_json = excluded.fields_json, updated_at = excluded.updated_at",
        )
        .bind(path.to_string())
        .bind(collection.to_string())
        .bind(path.leaf().to_string())
        .bind(fields_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context(SqliteWriteSnafu {
            stage: "sqlite-put-insert",
            path: path.to_string(),
        })?;

        Ok(())
    }

    pub async fn list_records(
        &self,
        collection: &DocumentPath,
    ) -> RemoteReadResult<Vec<AppendedRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            "SELECT id, fields_json FROM records WHERE collection = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(collection.to_string())
        .fetch_all(&self.pool)
        .await
        .context(SqliteReadSnafu {
            stage: "sqlite-list-records",
            collection: collection.to_string(),
        })?;

        rows.into_iter()
            .map(|row| -> RemoteReadResult<AppendedRecord> {
                let path = format!("{collection}/{}", row.id);
                let id = RecordId::parse(&row.id).map_err(|_| {
                    InvalidStoredPathSnafu {
                        stage: "sqlite-list-records-id",
                        path: path.clone(),
                    }
                    .build()
                })?;
                let fields = decode_fields(&row.fields_json).context(DecodeDocumentSnafu {
                    stage: "sqlite-list-records-decode",
                    path,
                })?;
                Ok(AppendedRecord {
                    id,
                    collection: collection.clone(),
                    fields,
                })
            })
            .collect()
    }
}

impl SyncClient for SqliteDocumentStore {
    async fn update_fields(&self, path: &DocumentPath, fields: FieldMap) -> RemoteWriteResult<()> {
        let path_key = path.to_string();
        let mut tx = self.pool.begin().await.context(SqliteWriteSnafu {
            stage: "sqlite-update-begin",
            path: path_key.clone(),
        })?;

        let stored = sqlx::query_scalar::<_, String>("SELECT fields_json FROM documents WHERE path = ?")
            .bind(path_key.as_str())
            .fetch_optional(&mut *tx)
            .await
            .context(SqliteWriteSnafu {
                stage: "sqlite-update-load",
                path: path_key.clone(),
            })?;

        let Some(stored) = stored else {
            return MissingDocumentSnafu {
                stage: "sqlite-update-missing",
                path: path_key,
            }
            .fail();
        };

        let mut current = decode_fields(&stored).context(DecodeStoredFieldsSnafu {
            stage: "sqlite-update-decode",
            path: path_key.clone(),
        })?;
        merge_fields(&mut current, fields);
        let merged_json = serde_json::to_string(&current).context(EncodeFieldsSnafu {
            stage: "sqlite-update-encode",
            path: path_key.clone(),
        })?;

        sqlx::query("UPDATE documents SET fields_json = ?, updated_at = ? WHERE path = ?")
            .bind(merged_json)
            .bind(unix_timestamp_seconds())
            .bind(path_key.as_str())
            .execute(&mut *tx)
            .await
            .context(SqliteWriteSnafu {
                stage: "sqlite-update-apply",
                path: path_key.clone(),
            })?;

        tx.commit().await.context(SqliteWriteSnafu {
            stage: "sqlite-update-commit",
            path: path_key,
        })?;

        Ok(())
    }

    async fn append_record(
        &self,
        collection: &DocumentPath,
        mut record: FieldMap,
    ) -> RemoteWriteResult<RecordId> {
        if !collection.is_collection() {
            return RejectedSnafu {
                stage: "sqlite-append-validate-path",
                path: collection.to_string(),
                kind: WriteFailureKind::Validation,
                details: "records must be appended to a collection".to_string(),
            }
            .fail();
        }

        let id = RecordId::new_v7();
        let now = unix_timestamp_seconds();
        record.insert(TIMESTAMP_FIELD.to_string(), Value::from(now));
        let fields_json = serde_json::to_string(&record).context(EncodeFieldsSnafu {
            stage: "sqlite-append-encode",
            path: collection.to_string(),
        })?;

        sqlx::query("INSERT INTO records (id, collection, fields_json, created_at) VALUES (?, ?, ?, ?)")
            .bind(id.to_string())
            .bind(collection.to_string())
            .bind(fields_json)
            .bind(now)
            .execute(&self.pool)
            .await
            .context(SqliteWriteSnafu {
                stage: "sqlite-append-insert",
                path: collection.to_string(),
            })?;

        Ok(id)
    }
}

impl DocumentSource for SqliteDocumentStore {
    async fn fetch_collection(&self, collection: &DocumentPath) -> RemoteReadResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT path, fields_json FROM documents WHERE collection = ? ORDER BY seq IS NULL, seq ASC, rowid ASC",
        )
        .bind(collection.to_string())
        .fetch_all(&self.pool)
        .await
        .context(SqliteReadSnafu {
            stage: "sqlite-fetch-collection",
            collection: collection.to_string(),
        })?;

        rows.into_iter().map(document_row_to_document).collect()
    }
}

fn document_row_to_document(row: DocumentRow) -> RemoteReadResult<Document> {
    let path = DocumentPath::parse(&row.path).map_err(|_| {
        InvalidStoredPathSnafu {
            stage: "sqlite-document-row-path",
            path: row.path.clone(),
        }
        .build()
    })?;
    let fields = decode_fields(&row.fields_json).context(DecodeDocumentSnafu {
        stage: "sqlite-document-row-decode",
        path: row.path,
    })?;

    Ok(Document { path, fields })
}

fn decode_fields(raw: &str) -> Result<FieldMap, serde_json::Error> {
    serde_json::from_str::<FieldMap>(raw)
}

fn unix_timestamp_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0_i64, |duration| duration.as_secs() as i64)
}

fn ensure_database_directory(database_location: &str) -> StorageResult<()> {
    if database_location.starts_with("sqlite:") || database_location == ":memory:" {
        return Ok(());
    }

    let path = Path::new(database_location);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context(CreateSqliteDirectorySnafu {
            stage: "sqlite-open-create-directory",
            path: parent.display().to_string(),
        })?;
    }

    Ok(())
}

fn normalize_database_url(database_location: &str) -> String {
    if database_location.starts_with("sqlite:") {
        return database_location.to_string();
    }

    if database_location == ":memory:" {
        return "sqlite::memory:".to_string();
    }

    format!("sqlite://{database_location}")
}
