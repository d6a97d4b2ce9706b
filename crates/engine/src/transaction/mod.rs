//! In-memory transaction
//!
//! A `MemoryTransaction` owns a private copy of the stores in its scope.
//! Requests queue up on `submit` and run strictly in submission order, one
//! per [`next_event`](Transaction::next_event) call:
//!
//! ```text
//! submit ──► queue ──► next_event ──► Success / Error
//!                         │
//!                         ├── unhandled Error from the previous pump ──► Abort
//!                         ├── abort() requested ──────────────────────► Abort
//!                         └── queue empty ────────────────────────────► Complete
//! ```
//!
//! `Complete` publishes the private copy; `Abort` discards it. Either way
//! the transaction is finished: further submits fail with
//! `TransactionInactive` and `next_event` returns `None`.

mod journal;

pub use journal::JournalEntry;

use crate::database::store::StoreState;
use crate::database::Shared;
use crate::transaction_ops::{
    Request, RequestId, StoreMeta, Transaction, TransactionMode, TxnEvent,
};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};
use txbatch_core::{EngineError, EngineErrorKind, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxnState {
    Active,
    Committed,
    Aborted,
}

/// Transaction over a [`MemoryDatabase`](crate::MemoryDatabase).
///
/// Dropping an unfinished transaction runs its queued requests and
/// commits, as an auto-committing engine does.
pub struct MemoryTransaction {
    id: u64,
    shared: Arc<Shared>,
    mode: TransactionMode,
    working: BTreeMap<String, StoreState>,
    queue: VecDeque<(RequestId, Request)>,
    next_request: RequestId,
    unhandled: Option<(RequestId, EngineError)>,
    /// Queued requests whose errors were handled ahead of time
    handled: HashSet<RequestId>,
    abort_requested: bool,
    state: TxnState,
}

impl MemoryTransaction {
    pub(crate) fn new(
        id: u64,
        shared: Arc<Shared>,
        mode: TransactionMode,
        working: BTreeMap<String, StoreState>,
    ) -> Self {
        Self {
            id,
            shared,
            mode,
            working,
            queue: VecDeque::new(),
            next_request: 1,
            unhandled: None,
            handled: HashSet::new(),
            abort_requested: false,
            state: TxnState::Active,
        }
    }

    /// Transaction id, as recorded in the journal.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the transaction still accepts requests.
    pub fn is_active(&self) -> bool {
        self.state == TxnState::Active && !self.abort_requested
    }

    /// Whether the transaction committed.
    pub fn is_committed(&self) -> bool {
        self.state == TxnState::Committed
    }

    /// Whether the transaction aborted.
    pub fn is_aborted(&self) -> bool {
        self.state == TxnState::Aborted
    }

    /// Number of queued requests.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn record(&self, entry: JournalEntry) {
        self.shared.journal.lock().push(entry);
    }

    fn execute(&mut self, request: Request) -> Result<Option<Value>, EngineError> {
        let native_unique = self.shared.native_unique;
        let store = self.working.get_mut(request.store()).ok_or_else(|| {
            EngineError::not_found(format!("no store '{}' in scope", request.store()))
        })?;
        match request {
            Request::Get { key, .. } => Ok(store.get(&key)),
            Request::Write {
                mode, value, key, ..
            } => store
                .write(mode, value, key, native_unique)
                .map(|k| Some(k.to_value())),
            Request::Delete { key, .. } => {
                store.delete(&key);
                Ok(None)
            }
            Request::Clear { .. } => {
                store.clear();
                Ok(None)
            }
            Request::IndexGetKey { index, key, .. } => store
                .index_get_key(&index, &key)
                .map(|pk| pk.map(|k| k.to_value())),
        }
    }

    fn finish_aborted(&mut self, error: Option<EngineError>) -> TxnEvent {
        self.queue.clear();
        self.handled.clear();
        self.working.clear();
        self.state = TxnState::Aborted;
        self.record(JournalEntry::Aborted { txn: self.id });
        debug!(target: "txbatch::engine", txn = self.id, error = ?error, "Transaction aborted");
        TxnEvent::Abort { error }
    }

    fn finish_committed(&mut self) -> TxnEvent {
        let working = std::mem::take(&mut self.working);
        {
            let mut stores = self.shared.stores.lock();
            for (name, state) in working {
                stores.insert(name, state);
            }
        }
        self.state = TxnState::Committed;
        self.record(JournalEntry::Committed { txn: self.id });
        debug!(target: "txbatch::engine", txn = self.id, "Transaction committed");
        TxnEvent::Complete
    }
}

impl Transaction for MemoryTransaction {
    fn store_names(&self) -> Vec<String> {
        self.working.keys().cloned().collect()
    }

    fn store(&self, name: &str) -> Result<StoreMeta, EngineError> {
        self.working
            .get(name)
            .map(|state| state.schema.meta())
            .ok_or_else(|| EngineError::not_found(format!("no store '{}' in scope", name)))
    }

    fn submit(&mut self, request: Request) -> Result<RequestId, EngineError> {
        if !self.is_active() {
            return Err(EngineError::inactive(format!(
                "transaction {} has finished",
                self.id
            )));
        }
        if !self.working.contains_key(request.store()) {
            return Err(EngineError::not_found(format!(
                "no store '{}' in scope",
                request.store()
            )));
        }
        if request.is_write() && self.mode == TransactionMode::ReadOnly {
            return Err(EngineError::new(
                EngineErrorKind::ReadOnly,
                format!("transaction {} is read-only", self.id),
            ));
        }

        let id = self.next_request;
        self.next_request += 1;
        trace!(target: "txbatch::engine", txn = self.id, request = id, kind = ?request.kind(), store = request.store(), "Request queued");
        self.record(JournalEntry::Submitted {
            txn: self.id,
            request: id,
            kind: request.kind(),
            store: request.store().to_string(),
        });
        self.queue.push_back((id, request));
        Ok(id)
    }

    fn next_event(&mut self) -> Option<TxnEvent> {
        if self.state != TxnState::Active {
            return None;
        }
        if let Some((_, error)) = self.unhandled.take() {
            return Some(self.finish_aborted(Some(error)));
        }
        if self.abort_requested {
            return Some(self.finish_aborted(None));
        }

        let Some((request, req)) = self.queue.pop_front() else {
            return Some(self.finish_committed());
        };
        match self.execute(req) {
            Ok(result) => {
                self.handled.remove(&request);
                self.record(JournalEntry::Delivered {
                    txn: self.id,
                    request,
                    ok: true,
                });
                Some(TxnEvent::Success { request, result })
            }
            Err(error) => {
                trace!(target: "txbatch::engine", txn = self.id, request, %error, "Request failed");
                self.record(JournalEntry::Delivered {
                    txn: self.id,
                    request,
                    ok: false,
                });
                if !self.handled.remove(&request) {
                    self.unhandled = Some((request, error.clone()));
                }
                Some(TxnEvent::Error { request, error })
            }
        }
    }

    fn prevent_default(&mut self, request: RequestId) {
        if matches!(self.unhandled, Some((pending, _)) if pending == request) {
            self.unhandled = None;
        } else if self.queue.iter().any(|(id, _)| *id == request) {
            self.handled.insert(request);
        }
    }

    fn abort(&mut self) {
        if self.state == TxnState::Active {
            self.abort_requested = true;
        }
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{IndexSchema, MemoryDatabase, StoreSchema};
    use crate::transaction_ops::Database;
    use serde_json::json;
    use txbatch_core::Key;

    fn db() -> MemoryDatabase {
        MemoryDatabase::builder()
            .store(StoreSchema::new("kv"))
            .store(
                StoreSchema::new("users")
                    .key_path("id")
                    .index(IndexSchema::new("by_email", "email").unique()),
            )
            .build()
    }

    fn open(db: &MemoryDatabase) -> MemoryTransaction {
        db.transaction(
            &["kv".to_string(), "users".to_string()],
            TransactionMode::ReadWrite,
        )
        .unwrap()
    }

    #[test]
    fn test_requests_run_in_order_then_commit() {
        let db = db();
        let mut txn = open(&db);
        let put = txn.put("kv", Value::Int(1), Some(Key::from("a"))).unwrap();
        let get = txn.get("kv", Key::from("a")).unwrap();

        assert_eq!(
            txn.next_event(),
            Some(TxnEvent::Success {
                request: put,
                result: Some(Value::from("a"))
            })
        );
        assert_eq!(
            txn.next_event(),
            Some(TxnEvent::Success {
                request: get,
                result: Some(Value::Int(1))
            })
        );
        // not visible outside the transaction before commit
        assert_eq!(db.get("kv", &Key::from("a")).unwrap(), None);
        assert_eq!(txn.next_event(), Some(TxnEvent::Complete));
        assert_eq!(txn.next_event(), None);
        assert!(txn.is_committed());
        assert_eq!(db.get("kv", &Key::from("a")).unwrap(), Some(Value::Int(1)));
    }

    #[test]
    fn test_unhandled_error_aborts() {
        let db = db();
        let mut txn = open(&db);
        txn.put("kv", Value::Int(1), Some(Key::from("a"))).unwrap();
        let bad = txn.add("kv", Value::Int(2), Some(Key::from("a"))).unwrap();

        assert!(matches!(txn.next_event(), Some(TxnEvent::Success { .. })));
        assert!(matches!(txn.next_event(), Some(TxnEvent::Error { request, .. }) if request == bad));
        assert!(matches!(
            txn.next_event(),
            Some(TxnEvent::Abort { error: Some(_) })
        ));
        assert!(txn.is_aborted());
        assert_eq!(db.get("kv", &Key::from("a")).unwrap(), None);
    }

    #[test]
    fn test_prevented_error_does_not_abort() {
        let db = db();
        let mut txn = open(&db);
        txn.put("kv", Value::Int(1), Some(Key::from("a"))).unwrap();
        let bad = txn.add("kv", Value::Int(2), Some(Key::from("a"))).unwrap();

        txn.next_event();
        txn.next_event();
        txn.prevent_default(bad);
        assert_eq!(txn.next_event(), Some(TxnEvent::Complete));
        assert_eq!(db.get("kv", &Key::from("a")).unwrap(), Some(Value::Int(1)));
    }

    #[test]
    fn test_error_handled_while_queued_does_not_abort() {
        let db = db();
        let mut txn = open(&db);
        txn.put("kv", Value::Int(1), Some(Key::from("a"))).unwrap();
        let bad = txn.add("kv", Value::Int(2), Some(Key::from("a"))).unwrap();
        txn.prevent_default(bad);

        assert!(matches!(txn.next_event(), Some(TxnEvent::Success { .. })));
        assert!(matches!(txn.next_event(), Some(TxnEvent::Error { request, .. }) if request == bad));
        assert_eq!(txn.next_event(), Some(TxnEvent::Complete));
        assert_eq!(db.get("kv", &Key::from("a")).unwrap(), Some(Value::Int(1)));
    }

    #[test]
    fn test_explicit_abort_discards_writes() {
        let db = db();
        let mut txn = open(&db);
        txn.put("kv", Value::Int(1), Some(Key::from("a"))).unwrap();
        txn.next_event();
        txn.abort();
        assert!(txn.put("kv", Value::Int(2), Some(Key::from("b"))).is_err());
        assert_eq!(txn.next_event(), Some(TxnEvent::Abort { error: None }));
        assert_eq!(db.get("kv", &Key::from("a")).unwrap(), None);
    }

    #[test]
    fn test_submit_outside_scope_fails() {
        let db = db();
        let mut txn = db
            .transaction(&["kv".to_string()], TransactionMode::ReadWrite)
            .unwrap();
        let err = txn.clear("users").unwrap_err();
        assert_eq!(err.kind, EngineErrorKind::NotFound);
        assert!(txn.store("users").is_err());
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let db = db();
        let mut txn = db
            .transaction(&["kv".to_string()], TransactionMode::ReadOnly)
            .unwrap();
        assert!(txn.get("kv", Key::from("a")).is_ok());
        let err = txn.delete("kv", Key::from("a")).unwrap_err();
        assert_eq!(err.kind, EngineErrorKind::ReadOnly);
    }

    #[test]
    fn test_drop_commits_pending_work() {
        let db = db();
        {
            let mut txn = open(&db);
            txn.put(
                "users",
                Value::from(json!({"id": "u1", "email": "a@x"})),
                None,
            )
            .unwrap();
        }
        assert!(db.get("users", &Key::from("u1")).unwrap().is_some());
    }

    #[test]
    fn test_journal_records_submission_and_delivery() {
        let db = db();
        let mut txn = open(&db);
        txn.clear("kv").unwrap();
        txn.finish();
        let journal = db.journal();
        assert!(matches!(journal[0].submitted(), Some((crate::RequestKind::Clear, "kv"))));
        assert!(journal[1].is_delivery());
        assert!(matches!(journal[2], JournalEntry::Committed { .. }));
    }
}
