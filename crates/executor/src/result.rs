//! Batch results

use txbatch_core::{OpResult, Value};

/// Per-store results of one group, in the group's store order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreResults {
    entries: Vec<(String, Vec<OpResult>)>,
}

impl StoreResults {
    /// Results for `store`, one per original operation.
    pub fn get(&self, store: &str) -> Option<&[OpResult]> {
        self.entries
            .iter()
            .find(|(name, _)| name == store)
            .map(|(_, results)| results.as_slice())
    }

    /// Take the results for `store`.
    pub fn remove(&mut self, store: &str) -> Option<Vec<OpResult>> {
        let pos = self.entries.iter().position(|(name, _)| name == store)?;
        Some(self.entries.remove(pos).1)
    }

    /// Store names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// `(store, results)` pairs, in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[OpResult])> {
        self.entries
            .iter()
            .map(|(name, results)| (name.as_str(), results.as_slice()))
    }

    /// Number of stores.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the group named no stores.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Vec<OpResult>)> for StoreResults {
    fn from_iter<I: IntoIterator<Item = (String, Vec<OpResult>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// One slot of the batch accumulator.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupResult {
    /// A mapping group's per-store results
    Stores(StoreResults),
    /// The value an adapter group produced
    Adapter(Option<Value>),
}

impl GroupResult {
    /// Results for `store`, if this is a mapping group that named it.
    pub fn store(&self, store: &str) -> Option<&[OpResult]> {
        match self {
            GroupResult::Stores(stores) => stores.get(store),
            GroupResult::Adapter(_) => None,
        }
    }

    /// Take the results for `store`.
    pub fn into_store(self, store: &str) -> Option<Vec<OpResult>> {
        match self {
            GroupResult::Stores(mut stores) => stores.remove(store),
            GroupResult::Adapter(_) => None,
        }
    }

    /// The adapter's value, if this is an adapter slot that produced one.
    pub fn adapter_value(&self) -> Option<&Value> {
        match self {
            GroupResult::Adapter(value) => value.as_ref(),
            GroupResult::Stores(_) => None,
        }
    }
}
