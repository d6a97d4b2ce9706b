//! txbatch - transactional batches over embedded object-store engines
//!
//! txbatch takes a declarative description of writes and deletes against
//! one or more object stores and drives it to completion inside a single
//! transaction, either strictly in order or with every request dispatched
//! at once.
//!
//! # Quick Start
//!
//! ```ignore
//! use txbatch::{batch, BatchOptions, MemoryDatabase, StoreSchema, Target};
//! use serde_json::json;
//!
//! let db = MemoryDatabase::builder().store(StoreSchema::new("kv")).build();
//!
//! // put "a", delete "b"
//! let results = batch(Target::database(&db), "kv", json!({"a": 1, "b": null}), &BatchOptions::default())?;
//! ```
//!
//! # Architecture
//!
//! - `txbatch-core`: values, keys, operations and the canonicalizer
//! - `txbatch-engine`: the engine capability traits and an in-memory engine
//! - `txbatch-executor`: the batch orchestrator and its entry points

pub use txbatch_core::{
    canonicalize, canonicalize_value, to_raw, EngineError, EngineErrorKind, Error, ErrorKind, Key,
    KeyPath, Object, OpResult, OpType, Operation, Ops, Result, Value, CLEAR_TOKEN,
};
pub use txbatch_engine::{
    Database, IndexMeta, IndexSchema, JournalEntry, MemoryDatabase, MemoryDatabaseBuilder,
    MemoryTransaction, Request, RequestId, RequestKind, StoreMeta, StoreSchema, Transaction,
    TransactionMode, TxnEvent, WriteMode,
};
pub use txbatch_executor::*;
