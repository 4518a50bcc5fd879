//! Error taxonomy surfaced by every storage backend.
//!
//! Callers match on the domain variants (`UnsupportedValueType`,
//! `MissingRangeValue`, `NotFound`, `ExpiredValue`); everything else is a
//! pass-through of what the backend or the codec reported.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors returned by [`Storage`](crate::Storage) implementations and the
/// record introspector.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The value is not a usable record: no hash key, no version attribute,
    /// or metadata that cannot be derived.
    #[error("unsupported value type")]
    UnsupportedValueType,

    /// The table has a range key but the caller did not supply one.
    #[error("missing range value")]
    MissingRangeValue,

    /// `first` matched no row.
    #[error("record not found")]
    NotFound,

    /// The optimistic version precondition failed. Re-read with `first`
    /// before retrying.
    #[error("expired value: the stored version has moved on")]
    ExpiredValue,

    /// A row with the same primary key already exists.
    #[error("duplicate key in {table}: {key}")]
    DuplicateKey { table: String, key: String },

    /// A `default=` literal does not parse into the attribute's kind.
    #[error("invalid default `{literal}` for attribute {attribute}: {reason}")]
    InvalidDefault {
        attribute: String,
        literal: String,
        reason: String,
    },

    /// The filter expression could not be compiled.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Encoding a record into, or decoding it out of, a document failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The per-operation deadline elapsed.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// The configured backend is not available in this build.
    #[error("unsupported storage backend: {0}")]
    UnsupportedBackend(String),

    /// An internal lock was poisoned by a panicking writer.
    #[error("storage lock poisoned during {0}")]
    Lock(&'static str),

    /// Pass-through of a MongoDB driver error.
    #[cfg(feature = "mongodb")]
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
}

impl StorageError {
    /// Whether retrying the same call (after a fresh read, for
    /// `ExpiredValue`) can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::ExpiredValue | StorageError::Timeout(_))
    }

    pub(crate) fn serialization(err: impl std::fmt::Display) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization(err)
    }
}

/// Errors produced while compiling a filter expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("expression root is not a comparison or boolean operation")]
    NotAComparison,

    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("unsupported operand type: {0}")]
    UnsupportedOperand(String),

    #[error("left operand must be an attribute name")]
    LeftOperandNotIdentifier,

    #[error("expression has {placeholders} placeholders but {arguments} arguments were given")]
    ArgumentCount { placeholders: usize, arguments: usize },
}
