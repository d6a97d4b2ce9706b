//! Core types for txbatch
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: Dynamic payload stored in object stores
//! - Key / KeyPath: Record keys and where they live inside values
//! - Operation / OpType: Typed mutation records
//! - Ops / canonicalize: The operation canonicalizer
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod canonical;
pub mod error;
pub mod key;
pub mod operation;
pub mod value;

pub use canonical::{canonicalize, canonicalize_value, to_raw, Ops, CLEAR_TOKEN};
pub use error::{EngineError, EngineErrorKind, Error, ErrorKind, Result};
pub use key::{Key, KeyPath};
pub use operation::{OpType, Operation};
pub use value::{Object, Value};

/// Result of one operation: the engine's returned key or value, `None`
/// where the engine returns nothing (delete, clear).
pub type OpResult = Option<Value>;
