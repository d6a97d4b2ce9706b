//! # txbatch executor
//!
//! Runs declarative batches of store operations inside one transaction of
//! any engine implementing [`txbatch_engine::Database`] /
//! [`txbatch_engine::Transaction`].
//!
//! ## Quick Start
//!
//! ```text
//! use txbatch_executor::{batch, transactional_batch, BatchOptions, StoreGroup, Target};
//!
//! // One store: a mapping puts non-null values and deletes nulls
//! let results = batch(Target::database(&db), "kv", json!({"a": 1, "b": null}), &BatchOptions::default())?;
//!
//! // Several stores, several groups, dispatched at once
//! let results = transactional_batch(
//!     Target::database(&db),
//!     vec![
//!         StoreGroup::new().store("users", vec![Operation::add("u1", json!({"name": "Ann"}))]),
//!         StoreGroup::new().store("kv", "clear"),
//!     ],
//!     &BatchOptions::default().parallel(),
//! )?;
//! ```
//!
//! ## Scheduling
//!
//! | Mode | Order |
//! |------|-------|
//! | serial (default) | groups in order, stores in order, one request at a time |
//! | parallel | every request dispatched at once, engine order |

#![warn(missing_docs)]

mod batch;
mod config;
mod group;
mod orchestrator;
mod result;
mod store_run;
mod submit;
mod unique;

// Test modules
#[cfg(test)]
mod tests;

pub use batch::{batch, store_names, transactional_batch, Target};
pub use config::{BatchOptions, CONFIG_FILE_NAME};
pub use group::{Adapter, AdapterOutcome, Groups, StoreGroup};
pub use orchestrator::BatchRun;
pub use result::{GroupResult, StoreResults};
