//! Emulated unique-index enforcement
//!
//! Some engines accept a write that duplicates a value already held in a
//! unique index. When emulation is on, every add/put first asks each unique
//! index of its store which primary key currently owns the value being
//! written:
//!
//! ```text
//! candidates(meta, value) ──► one index_get_key per unique index
//!                                     │
//!                         UniqueCheck::on_lookup (per answer)
//!                                     │
//!                     conflicts == 0 ─┴─ conflicts > 0
//!                     submit write       fail the operation
//! ```
//!
//! A failed check never aborts the transaction; it only refuses the one
//! operation.

use tracing::trace;
use txbatch_core::key::lookup;
use txbatch_core::{Key, KeyPath, Value};
use txbatch_engine::StoreMeta;

/// One index lookup the check has to make.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Candidate {
    pub(crate) index: String,
    pub(crate) key: Key,
}

/// Index key a single path component contributes, if any.
///
/// Absent fields, nulls, empty strings and values that are not valid keys
/// contribute nothing.
fn component(value: &Value, path: &str) -> Option<Key> {
    match lookup(value, path)? {
        Value::String(s) if s.is_empty() => None,
        v => Key::from_value(v),
    }
}

/// Index keys `value` would produce in each unique index of the store.
///
/// A compound index keeps the components that are present, in path order,
/// and is skipped entirely when none are.
pub(crate) fn candidates(meta: &StoreMeta, value: &Value) -> Vec<Candidate> {
    meta.unique_indexes()
        .filter_map(|index| {
            let key = match &index.key_path {
                KeyPath::Single(path) => component(value, path)?,
                KeyPath::Compound(paths) => {
                    let parts: Vec<Key> = paths.iter().filter_map(|p| component(value, p)).collect();
                    if parts.is_empty() {
                        return None;
                    }
                    Key::Array(parts)
                }
            };
            Some(Candidate {
                index: index.name.clone(),
                key,
            })
        })
        .collect()
}

/// Counts lookup answers for one pending write.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UniqueCheck {
    own_key: Option<Key>,
    awaiting: usize,
    conflicts: usize,
}

impl UniqueCheck {
    /// A check waiting for `awaiting` answers. `own_key` is the key of the
    /// record being written; a lookup that answers with it is no conflict.
    pub(crate) fn new(own_key: Option<Key>, awaiting: usize) -> Self {
        Self {
            own_key,
            awaiting,
            conflicts: 0,
        }
    }

    /// Record one answer. Returns `true` once every answer is in.
    pub(crate) fn on_lookup(&mut self, owner: Option<Value>) -> bool {
        if let Some(owner) = owner {
            let owner = Key::from_value(&owner);
            if owner.is_some() && owner != self.own_key {
                trace!(target: "txbatch::unique", owner = ?owner, own_key = ?self.own_key, "Unique value owned by another record");
                self.conflicts += 1;
            }
        }
        self.awaiting = self.awaiting.saturating_sub(1);
        self.awaiting == 0
    }

    pub(crate) fn conflicts(&self) -> usize {
        self.conflicts
    }
}
