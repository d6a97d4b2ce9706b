//! Storage engine capability - the request/event interface
//!
//! The batch executor never touches data directly. It consumes an engine
//! through the two traits in this module:
//!
//! - [`Database`] opens transactions scoped to a set of stores.
//! - [`Transaction`] accepts requests and reports their outcomes as
//!   [`TxnEvent`]s pulled through [`Transaction::next_event`].
//!
//! ## Design Principles
//!
//! 1. **Submitting never blocks**: `submit` only queues a request and hands
//!    back its [`RequestId`]; the outcome arrives later as an event.
//! 2. **One event per pump**: `next_event` delivers exactly one request
//!    outcome, or the transaction's own `Abort`/`Complete`.
//! 3. **Errors escalate unless handled**: a request error that is not
//!    passed to `prevent_default` before the next pump aborts the
//!    transaction.
//! 4. **Auto-commit**: a pump that finds no queued request commits.
//!
//! ## Usage
//!
//! ```text
//! let mut txn = db.transaction(&["users".into()], TransactionMode::ReadWrite)?;
//! let id = txn.put("users", Value::from("Ann"), Some(Key::from("u1")))?;
//! while let Some(event) = txn.next_event() {
//!     match event {
//!         TxnEvent::Success { request, result } if request == id => { /* ... */ }
//!         TxnEvent::Complete => break,
//!         _ => {}
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use txbatch_core::{EngineError, Key, KeyPath, Value};

/// Identifier of a submitted request, unique within its transaction.
pub type RequestId = u64;

/// Access mode of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionMode {
    /// Reads only
    ReadOnly,
    /// Reads and writes
    ReadWrite,
}

/// Secondary index declared on a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Index name
    pub name: String,
    /// Where the index key lives inside stored values
    pub key_path: KeyPath,
    /// Whether two records may share an index key
    pub unique: bool,
}

/// Shape of a store as seen from a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMeta {
    /// Store name
    pub name: String,
    /// In-line key path; `None` means keys are supplied out-of-band
    pub key_path: Option<KeyPath>,
    /// Whether the store generates integer keys
    pub auto_increment: bool,
    /// Declared indexes
    pub indexes: Vec<IndexMeta>,
}

impl StoreMeta {
    /// Names of every index, in declaration order.
    pub fn index_names(&self) -> impl Iterator<Item = &str> {
        self.indexes.iter().map(|i| i.name.as_str())
    }

    /// Look up an index by name.
    pub fn index(&self, name: &str) -> Option<&IndexMeta> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Indexes flagged unique.
    pub fn unique_indexes(&self) -> impl Iterator<Item = &IndexMeta> {
        self.indexes.iter().filter(|i| i.unique)
    }
}

/// Insert-or-fail versus upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriteMode {
    /// Fail with a constraint error if the key exists
    Add,
    /// Overwrite any existing record
    Put,
}

/// A request against one store.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Read the record at `key`; succeeds with `None` when absent
    Get {
        /// Target store
        store: String,
        /// Key to read
        key: Key,
    },
    /// Write `value`; succeeds with the record's key
    Write {
        /// Target store
        store: String,
        /// Add or put
        mode: WriteMode,
        /// Record to write
        value: Value,
        /// Out-of-band key; must be `None` for stores with a key path
        key: Option<Key>,
    },
    /// Delete the record at `key`; succeeds with `None`
    Delete {
        /// Target store
        store: String,
        /// Key to delete
        key: Key,
    },
    /// Delete every record; succeeds with `None`
    Clear {
        /// Target store
        store: String,
    },
    /// Primary key of the first record whose index key equals `key`
    IndexGetKey {
        /// Target store
        store: String,
        /// Index name
        index: String,
        /// Index key to look up
        key: Key,
    },
}

/// Kind of a [`Request`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// `Request::Get`
    Get,
    /// `Request::Write` in add mode
    Add,
    /// `Request::Write` in put mode
    Put,
    /// `Request::Delete`
    Delete,
    /// `Request::Clear`
    Clear,
    /// `Request::IndexGetKey`
    IndexGetKey,
}

impl Request {
    /// Store the request targets.
    pub fn store(&self) -> &str {
        match self {
            Request::Get { store, .. }
            | Request::Write { store, .. }
            | Request::Delete { store, .. }
            | Request::Clear { store }
            | Request::IndexGetKey { store, .. } => store,
        }
    }

    /// Kind of the request.
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Get { .. } => RequestKind::Get,
            Request::Write {
                mode: WriteMode::Add,
                ..
            } => RequestKind::Add,
            Request::Write {
                mode: WriteMode::Put,
                ..
            } => RequestKind::Put,
            Request::Delete { .. } => RequestKind::Delete,
            Request::Clear { .. } => RequestKind::Clear,
            Request::IndexGetKey { .. } => RequestKind::IndexGetKey,
        }
    }

    /// Whether the request mutates the store.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Request::Write { .. } | Request::Delete { .. } | Request::Clear { .. }
        )
    }
}

/// Notification delivered by [`Transaction::next_event`].
#[derive(Debug, Clone, PartialEq)]
pub enum TxnEvent {
    /// A request succeeded
    Success {
        /// Which request
        request: RequestId,
        /// Returned key or value; `None` for "undefined"
        result: Option<Value>,
    },
    /// A request failed
    Error {
        /// Which request
        request: RequestId,
        /// The failure
        error: EngineError,
    },
    /// The transaction aborted and rolled back
    Abort {
        /// The escalated request error, if the abort came from one
        error: Option<EngineError>,
    },
    /// The transaction committed
    Complete,
}

/// An open transaction over a fixed set of stores.
pub trait Transaction {
    /// Names of the stores in scope.
    fn store_names(&self) -> Vec<String>;

    /// Shape of a store in scope.
    ///
    /// Fails with a not-found error for stores outside the scope.
    fn store(&self, name: &str) -> Result<StoreMeta, EngineError>;

    /// Queue a request.
    ///
    /// Fails without queuing when the transaction has finished, the store
    /// is outside the scope, or a write is submitted to a read-only
    /// transaction.
    fn submit(&mut self, request: Request) -> Result<RequestId, EngineError>;

    /// Pull the next event; `None` once the transaction has finished and
    /// every event has been delivered.
    fn next_event(&mut self) -> Option<TxnEvent>;

    /// Mark a failed request as handled so it does not abort the
    /// transaction.
    ///
    /// May also be called while the request is still queued, in which
    /// case its error, if it fails, is handled in advance.
    fn prevent_default(&mut self, request: RequestId);

    /// Abort the transaction, discarding queued requests and every write.
    fn abort(&mut self);

    /// Queue a read.
    fn get(&mut self, store: &str, key: Key) -> Result<RequestId, EngineError> {
        self.submit(Request::Get {
            store: store.to_string(),
            key,
        })
    }

    /// Queue an upsert.
    fn put(&mut self, store: &str, value: Value, key: Option<Key>) -> Result<RequestId, EngineError> {
        self.submit(Request::Write {
            store: store.to_string(),
            mode: WriteMode::Put,
            value,
            key,
        })
    }

    /// Queue an insert.
    fn add(&mut self, store: &str, value: Value, key: Option<Key>) -> Result<RequestId, EngineError> {
        self.submit(Request::Write {
            store: store.to_string(),
            mode: WriteMode::Add,
            value,
            key,
        })
    }

    /// Queue a delete.
    fn delete(&mut self, store: &str, key: Key) -> Result<RequestId, EngineError> {
        self.submit(Request::Delete {
            store: store.to_string(),
            key,
        })
    }

    /// Queue a store-wide clear.
    fn clear(&mut self, store: &str) -> Result<RequestId, EngineError> {
        self.submit(Request::Clear {
            store: store.to_string(),
        })
    }

    /// Queue an index lookup returning the owning primary key.
    fn index_get_key(
        &mut self,
        store: &str,
        index: &str,
        key: Key,
    ) -> Result<RequestId, EngineError> {
        self.submit(Request::IndexGetKey {
            store: store.to_string(),
            index: index.to_string(),
            key,
        })
    }

    /// Pump events until the transaction has finished, discarding them.
    fn finish(&mut self) {
        while self.next_event().is_some() {}
    }
}

/// A database that can open transactions.
pub trait Database {
    /// Transaction type produced by this database
    type Transaction: Transaction;

    /// Open a transaction over `stores`.
    ///
    /// Fails with a not-found error if any store does not exist.
    fn transaction(
        &self,
        stores: &[String],
        mode: TransactionMode,
    ) -> Result<Self::Transaction, EngineError>;
}
