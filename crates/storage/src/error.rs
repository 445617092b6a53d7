use std::fmt;

use snafu::Snafu;

/// Coarse cause classification for a rejected remote write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteFailureKind {
    Network,
    Permission,
    Validation,
    NotFound,
    Backend,
}

impl fmt::Display for WriteFailureKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Network => "network",
            Self::Permission => "permission",
            Self::Validation => "validation",
            Self::NotFound => "not-found",
            Self::Backend => "backend",
        };
        formatter.write_str(label)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum IdError {
    #[snafu(display("document id '{raw}' is invalid for {id_type}: {reason}"))]
    InvalidDocumentId {
        stage: &'static str,
        id_type: &'static str,
        raw: String,
        reason: &'static str,
    },
    #[snafu(display("record id '{raw}' is not a valid uuid"))]
    InvalidRecordId {
        stage: &'static str,
        raw: String,
        source: uuid::Error,
    },
}

/// Failure of a field update or record append against the remote store.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RemoteWriteError {
    #[snafu(display("remote write to '{path}' was rejected ({kind}): {details}"))]
    Rejected {
        stage: &'static str,
        path: String,
        kind: WriteFailureKind,
        details: String,
    },
    #[snafu(display("remote document '{path}' does not exist"))]
    MissingDocument { stage: &'static str, path: String },
    #[snafu(display("failed to encode fields for '{path}': {source}"))]
    EncodeFields {
        stage: &'static str,
        path: String,
        source: serde_json::Error,
    },
    #[snafu(display("stored document '{path}' holds malformed fields: {source}"))]
    DecodeStoredFields {
        stage: &'static str,
        path: String,
        source: serde_json::Error,
    },
    #[snafu(display("sqlite write to '{path}' failed at {stage}: {source}"))]
    SqliteWrite {
        stage: &'static str,
        path: String,
        source: sqlx::Error,
    },
}

impl RemoteWriteError {
    pub fn kind(&self) -> WriteFailureKind {
        match self {
            Self::Rejected { kind, .. } => *kind,
            Self::MissingDocument { .. } => WriteFailureKind::NotFound,
            Self::EncodeFields { .. } | Self::DecodeStoredFields { .. } => {
                WriteFailureKind::Validation
            }
            Self::SqliteWrite { .. } => WriteFailureKind::Backend,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::Rejected { stage, .. }
            | Self::MissingDocument { stage, .. }
            | Self::EncodeFields { stage, .. }
            | Self::DecodeStoredFields { stage, .. }
            | Self::SqliteWrite { stage, .. } => *stage,
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RemoteReadError {
    #[snafu(display("remote collection '{collection}' is unavailable: {details}"))]
    Unavailable {
        stage: &'static str,
        collection: String,
        details: String,
    },
    #[snafu(display("stored document '{path}' holds malformed fields: {source}"))]
    DecodeDocument {
        stage: &'static str,
        path: String,
        source: serde_json::Error,
    },
    #[snafu(display("stored document path '{path}' is invalid"))]
    InvalidStoredPath { stage: &'static str, path: String },
    #[snafu(display("sqlite read of '{collection}' failed at {stage}: {source}"))]
    SqliteRead {
        stage: &'static str,
        collection: String,
        source: sqlx::Error,
    },
}

/// Errors raised while opening a local backing store.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    #[snafu(display("failed to create sqlite directory at {path}"))]
    CreateSqliteDirectory {
        stage: &'static str,
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("failed to parse sqlite connection URL '{database_url}'"))]
    SqliteConnectOptions {
        stage: &'static str,
        database_url: String,
        source: sqlx::Error,
    },
    #[snafu(display("failed to connect sqlite database '{database_url}'"))]
    SqliteConnect {
        stage: &'static str,
        database_url: String,
        source: sqlx::Error,
    },
    #[snafu(display("failed to configure sqlite pragma '{pragma}'"))]
    SqlitePragma {
        stage: &'static str,
        pragma: &'static str,
        source: sqlx::Error,
    },
    #[snafu(display("failed to run sqlite migrations"))]
    SqliteMigrate {
        stage: &'static str,
        source: sqlx::migrate::MigrateError,
    },
}

pub type IdResult<T> = Result<T, IdError>;
pub type RemoteWriteResult<T> = Result<T, RemoteWriteError>;
pub type RemoteReadResult<T> = Result<T, RemoteReadError>;
pub type StorageResult<T> = Result<T, StorageError>;
