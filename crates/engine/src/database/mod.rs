//! In-memory reference database
//!
//! `MemoryDatabase` implements the [`Database`] capability with plain
//! ordered maps. It is deterministic and single-threaded in spirit: each
//! transaction works on a private copy of the stores in its scope and
//! publishes that copy on commit, so transactions over overlapping stores
//! are expected to run one after another.
//!
//! ## Native unique enforcement
//!
//! Some engines do not reliably reject writes that duplicate a value in a
//! unique index. `native_unique(false)` reproduces that: the database then
//! accepts such writes silently, which is what the batch executor's
//! emulated check exists for.

pub(crate) mod schema;
pub(crate) mod store;

pub use schema::{IndexSchema, StoreSchema};

use crate::transaction::{JournalEntry, MemoryTransaction};
use crate::transaction_ops::{Database, TransactionMode};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use store::StoreState;
use tracing::debug;
use txbatch_core::{EngineError, Key, Value};

pub(crate) struct Shared {
    pub(crate) stores: Mutex<BTreeMap<String, StoreState>>,
    pub(crate) journal: Mutex<Vec<JournalEntry>>,
    pub(crate) native_unique: bool,
    next_txn: AtomicU64,
}

impl Shared {
    pub(crate) fn next_txn_id(&self) -> u64 {
        self.next_txn.fetch_add(1, Ordering::Relaxed)
    }
}

/// In-memory database of named object stores.
///
/// Cloning is cheap; clones share the same stores.
#[derive(Clone)]
pub struct MemoryDatabase {
    shared: Arc<Shared>,
}

/// Builder for [`MemoryDatabase`].
#[derive(Debug, Clone)]
pub struct MemoryDatabaseBuilder {
    stores: Vec<StoreSchema>,
    native_unique: bool,
}

impl MemoryDatabaseBuilder {
    /// Declare a store.
    pub fn store(mut self, schema: StoreSchema) -> Self {
        self.stores.push(schema);
        self
    }

    /// Whether the engine itself rejects unique-index violations
    /// (default: true).
    pub fn native_unique(mut self, enforce: bool) -> Self {
        self.native_unique = enforce;
        self
    }

    /// Build the database.
    pub fn build(self) -> MemoryDatabase {
        let stores = self
            .stores
            .into_iter()
            .map(|schema| (schema.name().to_string(), StoreState::new(schema)))
            .collect();
        MemoryDatabase {
            shared: Arc::new(Shared {
                stores: Mutex::new(stores),
                journal: Mutex::new(Vec::new()),
                native_unique: self.native_unique,
                next_txn: AtomicU64::new(1),
            }),
        }
    }
}

impl MemoryDatabase {
    /// Start building a database.
    pub fn builder() -> MemoryDatabaseBuilder {
        MemoryDatabaseBuilder {
            stores: Vec::new(),
            native_unique: true,
        }
    }

    /// Names of every store.
    pub fn store_names(&self) -> Vec<String> {
        self.shared.stores.lock().keys().cloned().collect()
    }

    /// Read a committed record.
    pub fn get(&self, store: &str, key: &Key) -> Result<Option<Value>, EngineError> {
        let stores = self.shared.stores.lock();
        let state = stores
            .get(store)
            .ok_or_else(|| EngineError::not_found(format!("no store '{}'", store)))?;
        Ok(state.get(key))
    }

    /// Every committed record of a store, in key order.
    pub fn records(&self, store: &str) -> Result<Vec<(Key, Value)>, EngineError> {
        let stores = self.shared.stores.lock();
        let state = stores
            .get(store)
            .ok_or_else(|| EngineError::not_found(format!("no store '{}'", store)))?;
        Ok(state
            .records
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    /// Insert committed records directly, bypassing transactions and
    /// constraint checks.
    pub fn load<I>(&self, store: &str, records: I) -> Result<(), EngineError>
    where
        I: IntoIterator<Item = (Key, Value)>,
    {
        let mut stores = self.shared.stores.lock();
        let state = stores
            .get_mut(store)
            .ok_or_else(|| EngineError::not_found(format!("no store '{}'", store)))?;
        state.records.extend(records);
        Ok(())
    }

    /// Requests submitted and delivered so far, across all transactions.
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.shared.journal.lock().clone()
    }

    /// Forget the journal.
    pub fn clear_journal(&self) {
        self.shared.journal.lock().clear();
    }
}

impl Database for MemoryDatabase {
    type Transaction = MemoryTransaction;

    fn transaction(
        &self,
        stores: &[String],
        mode: TransactionMode,
    ) -> Result<MemoryTransaction, EngineError> {
        let committed = self.shared.stores.lock();
        let mut working = BTreeMap::new();
        for name in stores {
            let state = committed
                .get(name)
                .ok_or_else(|| EngineError::not_found(format!("no store '{}'", name)))?;
            working.insert(name.clone(), state.clone());
        }
        drop(committed);

        let id = self.shared.next_txn_id();
        debug!(target: "txbatch::engine", txn = id, stores = ?stores, ?mode, "Transaction opened");
        Ok(MemoryTransaction::new(id, Arc::clone(&self.shared), mode, working))
    }
}
