//! Error types for txbatch
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! # Categories
//!
//! | Kind | Variants | Description |
//! |------|----------|-------------|
//! | Argument | `InvalidArgument` | Malformed call shape, no engine interaction |
//! | Validation | `InvalidOps` | Operation list failed canonicalization |
//! | Constraint | `ConstraintViolation`, `MissingSource` | Emulated checks failed one operation |
//! | Engine | `Engine`, `Aborted`, `Adapter`, `Internal` | Engine or transaction failure |

use crate::key::Key;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for txbatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Named failure reported by the storage engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineErrorKind {
    /// A write violated a key or index constraint
    Constraint,
    /// A key or value was not acceptable to the store
    Data,
    /// A store or index does not exist in the transaction scope
    NotFound,
    /// A write was attempted in a read-only transaction
    ReadOnly,
    /// The transaction has already finished
    TransactionInactive,
    /// The transaction was aborted
    Abort,
    /// Anything else
    Unknown,
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineErrorKind::Constraint => "ConstraintError",
            EngineErrorKind::Data => "DataError",
            EngineErrorKind::NotFound => "NotFoundError",
            EngineErrorKind::ReadOnly => "ReadOnlyError",
            EngineErrorKind::TransactionInactive => "TransactionInactiveError",
            EngineErrorKind::Abort => "AbortError",
            EngineErrorKind::Unknown => "UnknownError",
        };
        f.write_str(name)
    }
}

/// Error reported by the storage engine for a request or a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct EngineError {
    /// Which failure occurred
    pub kind: EngineErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl EngineError {
    /// Create an engine error.
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Constraint failure.
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Constraint, message)
    }

    /// Data failure.
    pub fn data(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::Data, message)
    }

    /// Missing store or index.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::NotFound, message)
    }

    /// Request against a finished transaction.
    pub fn inactive(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::TransactionInactive, message)
    }
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed call shape
    Argument,
    /// Operation list failed canonicalization
    Validation,
    /// A single operation was refused before its write was issued
    Constraint,
    /// The engine or the transaction failed
    Engine,
}

/// Error types for batch execution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed call shape (empty store name, non-mapping group)
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong
        reason: String,
    },

    /// Operation list failed canonicalization
    #[error("invalid ops: {reason}")]
    InvalidOps {
        /// What was wrong
        reason: String,
    },

    /// A write would duplicate a value in a unique index
    #[error("unique index constraint violated in store '{store}' ({conflicts} conflicting index(es))")]
    ConstraintViolation {
        /// Store being written
        store: String,
        /// Number of unique indexes owned by a different record
        conflicts: usize,
    },

    /// The source record of a move or copy does not exist
    #[error("source key {key} not found in store '{store}'")]
    MissingSource {
        /// Store being read
        store: String,
        /// Source key that was read
        key: Key,
    },

    /// Request or transaction failure reported by the engine
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// The transaction was aborted
    #[error("transaction aborted: {reason}")]
    Aborted {
        /// Abort cause, when the engine supplied one
        reason: String,
    },

    /// An adapter group failed
    #[error("adapter failed: {reason}")]
    Adapter {
        /// What the adapter reported
        reason: String,
    },

    /// Internal error (bug or invariant violation)
    #[error("internal error: {reason}")]
    Internal {
        /// What went wrong
        reason: String,
    },
}

impl Error {
    /// Build an argument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Build a validation error.
    pub fn invalid_ops(reason: impl Into<String>) -> Self {
        Error::InvalidOps {
            reason: reason.into(),
        }
    }

    /// Build an adapter error.
    pub fn adapter(reason: impl Into<String>) -> Self {
        Error::Adapter {
            reason: reason.into(),
        }
    }

    /// Build an internal error.
    pub fn internal(reason: impl Into<String>) -> Self {
        Error::Internal {
            reason: reason.into(),
        }
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument { .. } => ErrorKind::Argument,
            Error::InvalidOps { .. } => ErrorKind::Validation,
            Error::ConstraintViolation { .. } | Error::MissingSource { .. } => {
                ErrorKind::Constraint
            }
            Error::Engine(_) | Error::Aborted { .. } | Error::Adapter { .. } | Error::Internal { .. } => {
                ErrorKind::Engine
            }
        }
    }

    /// Whether this is a type error: a bad call shape or a bad operation list.
    pub fn is_type_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Argument | ErrorKind::Validation)
    }
}
