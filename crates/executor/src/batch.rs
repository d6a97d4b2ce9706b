//! Batch entry points
//!
//! - [`transactional_batch`]: any number of groups over any number of
//!   stores, in one transaction
//! - [`batch`]: one store's operations, results unwrapped
//! - [`store_names`]: every store a list of groups touches

use crate::config::BatchOptions;
use crate::group::{Groups, StoreGroup};
use crate::orchestrator::BatchRun;
use crate::result::GroupResult;
use txbatch_core::{canonicalize, Error, OpResult, Ops, Result};
use txbatch_engine::{Database, Transaction};

/// Where a batch runs.
pub enum Target<'a, T: Transaction> {
    /// Open a fresh read-write transaction over the stores the batch names
    Database(&'a dyn Database<Transaction = T>),
    /// Run inside a transaction the caller already holds
    Transaction(&'a mut T),
}

impl<'a, T: Transaction> Target<'a, T> {
    /// Run against a database.
    pub fn database<D>(db: &'a D) -> Self
    where
        D: Database<Transaction = T>,
    {
        Target::Database(db)
    }

    /// Run inside an open transaction.
    pub fn transaction(txn: &'a mut T) -> Self {
        Target::Transaction(txn)
    }
}

/// Every store named across `groups`, first occurrence first, without
/// repeats. Adapter groups name none.
pub fn store_names<T>(groups: &[StoreGroup<T>]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in groups.iter().flat_map(StoreGroup::store_names) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Run groups of operations in one transaction.
///
/// Returns one [`GroupResult`] per group. Fails on the first error; a
/// transaction the batch opened itself is still drained afterwards, so
/// writes that succeeded before the failure are committed unless the
/// transaction aborted.
///
/// # Example
///
/// ```text
/// let results = transactional_batch(
///     Target::database(&db),
///     vec![
///         StoreGroup::new().store("users", json!({"u1": {"name": "Ann"}})),
///         StoreGroup::new().store("kv", "clear"),
///     ],
///     &BatchOptions::default(),
/// )?;
/// ```
pub fn transactional_batch<T: Transaction>(
    target: Target<'_, T>,
    groups: impl Into<Groups<T>>,
    options: &BatchOptions,
) -> Result<Vec<GroupResult>> {
    BatchRun::new(groups, options.clone()).run(target)
}

/// Run one store's operations in one transaction and return their results.
///
/// The operations are checked before the target is touched.
pub fn batch<T: Transaction>(
    target: Target<'_, T>,
    store: &str,
    ops: impl Into<Ops>,
    options: &BatchOptions,
) -> Result<Vec<OpResult>> {
    if store.is_empty() {
        return Err(Error::invalid_argument("store name must not be empty"));
    }
    let ops = canonicalize(&ops.into())?;
    let results = transactional_batch(target, StoreGroup::new().store(store, ops), options)?;
    results
        .into_iter()
        .next()
        .and_then(|slot| slot.into_store(store))
        .ok_or_else(|| Error::internal(format!("no results for store '{}'", store)))
}
