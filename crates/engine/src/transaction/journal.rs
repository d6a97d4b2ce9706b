//! Request journal
//!
//! Every request a [`MemoryTransaction`](super::MemoryTransaction) accepts
//! and every outcome it delivers is appended to the database journal, so
//! tests can assert on issue order and on what was observed when.

use crate::transaction_ops::{RequestId, RequestKind};

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    /// A request was queued
    Submitted {
        /// Owning transaction
        txn: u64,
        /// Request id within the transaction
        request: RequestId,
        /// What kind of request
        kind: RequestKind,
        /// Target store
        store: String,
    },
    /// A request outcome was handed to the caller
    Delivered {
        /// Owning transaction
        txn: u64,
        /// Request id within the transaction
        request: RequestId,
        /// Whether it succeeded
        ok: bool,
    },
    /// The transaction committed
    Committed {
        /// Transaction id
        txn: u64,
    },
    /// The transaction aborted
    Aborted {
        /// Transaction id
        txn: u64,
    },
}

impl JournalEntry {
    /// Kind and store of a `Submitted` entry.
    pub fn submitted(&self) -> Option<(RequestKind, &str)> {
        match self {
            JournalEntry::Submitted { kind, store, .. } => Some((*kind, store.as_str())),
            _ => None,
        }
    }

    /// Whether this is a `Delivered` entry.
    pub fn is_delivery(&self) -> bool {
        matches!(self, JournalEntry::Delivered { .. })
    }
}
