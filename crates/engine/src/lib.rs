//! Storage engine capability for txbatch
//!
//! This crate defines what the batch executor needs from a storage engine
//! and ships one engine that provides it:
//! - Capability: the [`Database`] and [`Transaction`] traits with their
//!   request and event types
//! - MemoryDatabase: a deterministic in-memory engine of named object
//!   stores with key paths, auto-increment and indexes
//! - Journal: an ordered record of submitted and delivered requests, used
//!   to observe dispatch order
//!
//! Any engine implementing the two traits can run batches.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod transaction;
pub mod transaction_ops;

pub use database::{IndexSchema, MemoryDatabase, MemoryDatabaseBuilder, StoreSchema};
pub use transaction::{JournalEntry, MemoryTransaction};
pub use transaction_ops::{
    Database, IndexMeta, Request, RequestId, RequestKind, StoreMeta, Transaction,
    TransactionMode, TxnEvent, WriteMode,
};
