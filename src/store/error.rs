//! Store error types.
//!
//! Every backend reports failures through [`StoreError`]. The core passes
//! them through to callers untouched.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::git::InvalidNameError;

/// The error type for document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// error from the underlying git library
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("database not found: {0}")]
    DatabaseNotFound(String),

    #[error("database already exists: {0}")]
    DatabaseAlreadyExists(String),

    #[error("table not found: {db}.{table}")]
    TableNotFound { db: String, table: String },

    #[error("table already exists: {db}.{table}")]
    TableAlreadyExists { db: String, table: String },

    /// no record stored under the key
    #[error("record not found: table={table}, key={key}")]
    RecordNotFound { table: String, key: String },

    /// duplicate primary key on insert
    #[error("record already exists: table={table}, key={key}")]
    RecordAlreadyExists { table: String, key: String },

    /// the document lacks the table's primary key field
    #[error("document for table {table} is missing primary key '{primary_key}'")]
    MissingPrimaryKey { table: String, primary_key: String },

    /// primary key values must be strings or numbers
    #[error("invalid primary key value: {0}")]
    InvalidKey(String),

    /// database, table or key name rejected by the backend
    #[error("invalid name: {0}")]
    InvalidName(#[from] InvalidNameError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// stored data failed an integrity check
    #[error("corrupted data at {path}: {reason}")]
    CorruptedData { path: PathBuf, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// repo has no commits
    #[error("repository is empty: no commits found")]
    EmptyRepository,

    #[error("commit not found: {0}")]
    CommitNotFound(String),

    #[error("ref not found: {0}")]
    RefNotFound(String),

    /// the tree entry has an unexpected type
    #[error("unexpected entry type at {path}: expected {expected}, found {found}")]
    UnexpectedEntryType {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// the branch moved between reading and advancing it
    #[error("concurrent modification: branch {branch} was updated by another writer")]
    ConcurrentModification { branch: String },

    /// a blocking task panicked or was cancelled
    #[error("background task failed: {0}")]
    Task(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::DatabaseNotFound(_)
                | StoreError::TableNotFound { .. }
                | StoreError::RecordNotFound { .. }
                | StoreError::RefNotFound(_)
                | StoreError::CommitNotFound(_)
        )
    }

    /// check if this error is a conflict
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::DatabaseAlreadyExists(_)
                | StoreError::TableAlreadyExists { .. }
                | StoreError::RecordAlreadyExists { .. }
                | StoreError::ConcurrentModification { .. }
        )
    }

    /// check if this error is recoverable by retry
    pub fn is_retriable(&self) -> bool {
        matches!(self, StoreError::ConcurrentModification { .. })
    }
}

/// result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
