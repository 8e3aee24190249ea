//! Error types surfaced by the repository, schema engine and models.
//!
//! Errors are flat: callers branch on [`ErrorKind`] (or match the variant),
//! never on a hierarchy. Every message is stable and meant to be shown or
//! compared as-is.

use thiserror::Error;

use crate::store::StoreError;
use crate::validation::Violation;

/// Result type for repository, model and schema operations.
pub type OdmResult<T> = Result<T, OdmError>;

/// Misuse of the repository lifecycle or registry contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RepositoryError {
    message: String,
}

impl RepositoryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A structural defect in a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SchemaError {
    message: String,
}

impl SchemaError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Instance values that fail their schema's rules.
///
/// Carries every violation found, not just the first.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
    details: Vec<Violation>,
}

impl ValidationError {
    /// A validation failure with no per-field details.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// A validation failure built from rule violations.
    pub fn from_violations(details: Vec<Violation>) -> Self {
        let message = details
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join(". ");
        Self { message, details }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Every per-field violation.
    pub fn details(&self) -> &[Violation] {
        &self.details
    }
}

/// The kind of an [`OdmError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Repository,
    Schema,
    Validation,
    Store,
    Initialization,
}

/// One model's failure during a batched initialisation.
#[derive(Debug)]
pub struct ModelFailure {
    pub model: String,
    pub error: OdmError,
}

/// Top-level error for repository, model and schema operations.
#[derive(Debug, Error)]
pub enum OdmError {
    #[error("RepositoryError: {0}")]
    Repository(#[from] RepositoryError),

    #[error("SchemaError: {0}")]
    Schema(#[from] SchemaError),

    #[error("ValidationError: {0}")]
    Validation(#[from] ValidationError),

    /// Store failures pass through unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// More than one model failed during `init`.
    #[error("initialisation failed for {} models: {}", .failures.len(), failures_display(.failures))]
    Initialization { failures: Vec<ModelFailure> },
}

fn failures_display(failures: &[ModelFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("'{}': {}", f.model, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl OdmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OdmError::Repository(_) => ErrorKind::Repository,
            OdmError::Schema(_) => ErrorKind::Schema,
            OdmError::Validation(_) => ErrorKind::Validation,
            OdmError::Store(_) => ErrorKind::Store,
            OdmError::Initialization { .. } => ErrorKind::Initialization,
        }
    }

    /// The bare message, without the kind prefix used by `Display`.
    pub fn message(&self) -> String {
        match self {
            OdmError::Repository(e) => e.message().to_string(),
            OdmError::Schema(e) => e.message().to_string(),
            OdmError::Validation(e) => e.message().to_string(),
            other => other.to_string(),
        }
    }

    pub(crate) fn repository(message: impl Into<String>) -> Self {
        OdmError::Repository(RepositoryError::new(message))
    }

    pub(crate) fn schema(message: impl Into<String>) -> Self {
        OdmError::Schema(SchemaError::new(message))
    }
}
