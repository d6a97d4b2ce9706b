//! Batch orchestrator
//!
//! `BatchRun` drives every group of a batch through one transaction and
//! settles exactly once:
//!
//! ```text
//!            start
//!              │
//!   serial:  group 0 ─► group 1 ─► ... (each store of a group in turn)
//!   parallel: every group, every store, dispatched at once
//!              │
//!   handle(event) ── Success ──► route to store run / adapter, advance
//!                 ── Error ────► prevent_default, reject
//!                 ── Abort ────► reject
//!                 ── Complete ─► resolve (every group finished)
//! ```
//!
//! With `resolve_early`, the run resolves as soon as the last group
//! finishes instead of waiting for `Complete`. Events arriving after
//! settlement change nothing, and requests still outstanding at
//! settlement are marked handled on the transaction, so their late
//! failures cannot abort it.

use crate::batch::{store_names, Target};
use crate::config::BatchOptions;
use crate::group::{Adapter, AdapterOutcome, GroupKind, Groups, StoreGroup};
use crate::result::{GroupResult, StoreResults};
use crate::store_run::{Dispatch, StoreRun};
use crate::submit::{Route, Submitter};
use std::collections::HashMap;
use tracing::{debug, warn};
use txbatch_core::{canonicalize, Error, OpResult, Result};
use txbatch_engine::{RequestId, Transaction, TransactionMode, TxnEvent};

type AdapterCallback<T> = Box<dyn FnMut(&mut T, Adapter<T>) -> Result<AdapterOutcome>>;

enum GroupState<T> {
    Waiting(StoreGroup<T>),
    Stores { runs: Vec<StoreRun>, current: usize },
    Adapter,
    Finished,
}

enum Settlement {
    Pending,
    Settled(Result<Vec<GroupResult>>),
    Taken,
}

/// A batch in progress.
///
/// The free functions [`transactional_batch`](crate::transactional_batch)
/// and [`batch`](crate::batch) build and drive one of these. Callers that
/// pump the transaction themselves can drive it directly:
///
/// ```text
/// let mut run = BatchRun::new(groups, options);
/// run.start(&mut txn);
/// while !run.is_settled() {
///     let event = txn.next_event().expect("transaction finished early");
///     run.handle(&mut txn, event);
/// }
/// let results = run.outcome().unwrap()?;
/// ```
pub struct BatchRun<T: Transaction> {
    options: BatchOptions,
    dispatch: Dispatch,
    adapter_cb: Option<AdapterCallback<T>>,
    scope: Vec<String>,
    invalid: Option<Error>,
    groups: Vec<GroupState<T>>,
    results: Vec<Option<GroupResult>>,
    cursor: usize,
    routes: HashMap<RequestId, Route>,
    settlement: Settlement,
    started: bool,
}

impl<T: Transaction> BatchRun<T> {
    /// Prepare a run. Nothing is submitted until [`start`](Self::start).
    pub fn new(groups: impl Into<Groups<T>>, options: BatchOptions) -> Self {
        let groups = groups.into();
        let mut scope = store_names(&groups);
        for extra in &options.extra_stores {
            if !scope.contains(extra) {
                scope.push(extra.clone());
            }
        }
        let invalid = groups.iter().find_map(|g| g.validate().err());
        let groups: Vec<_> = groups.into_inner().into_iter().map(GroupState::Waiting).collect();
        let dispatch = if options.parallel {
            Dispatch::Parallel
        } else {
            Dispatch::Serial
        };
        Self {
            options,
            dispatch,
            adapter_cb: None,
            scope,
            invalid,
            results: (0..groups.len()).map(|_| None).collect(),
            groups,
            cursor: 0,
            routes: HashMap::new(),
            settlement: Settlement::Pending,
            started: false,
        }
    }

    /// Hand every adapter to `cb` instead of calling it directly.
    pub fn with_adapter_callback<F>(mut self, cb: F) -> Self
    where
        F: FnMut(&mut T, Adapter<T>) -> Result<AdapterOutcome> + 'static,
    {
        self.adapter_cb = Some(Box::new(cb));
        self
    }

    /// Stores a transaction opened for this run is scoped to: every store
    /// the groups name, then the extra stores.
    pub fn scope(&self) -> &[String] {
        &self.scope
    }

    /// Whether the run has resolved or rejected.
    pub fn is_settled(&self) -> bool {
        !matches!(self.settlement, Settlement::Pending)
    }

    /// Take the outcome once settled.
    pub fn outcome(&mut self) -> Option<Result<Vec<GroupResult>>> {
        match std::mem::replace(&mut self.settlement, Settlement::Taken) {
            Settlement::Settled(outcome) => Some(outcome),
            Settlement::Pending => {
                self.settlement = Settlement::Pending;
                None
            }
            Settlement::Taken => None,
        }
    }

    /// Submit the first requests.
    pub fn start(&mut self, txn: &mut T) {
        if self.started {
            return;
        }
        self.started = true;
        if let Some(err) = self.invalid.take() {
            self.reject(err);
            return;
        }
        debug!(target: "txbatch::batch", groups = self.groups.len(), parallel = self.options.parallel, resolve_early = self.options.resolve_early, "Batch started");

        let started = match self.dispatch {
            Dispatch::Serial => self.progress(txn),
            Dispatch::Parallel => self.start_parallel(txn),
        };
        if let Err(e) = started {
            self.reject(e);
        }
        self.release(txn);
    }

    /// Feed one transaction event to the run.
    pub fn handle(&mut self, txn: &mut T, event: TxnEvent) {
        self.on_event(txn, event);
        self.release(txn);
    }

    fn on_event(&mut self, txn: &mut T, event: TxnEvent) {
        match event {
            TxnEvent::Success { request, result } => {
                let Some(route) = self.routes.remove(&request) else {
                    return;
                };
                if self.is_settled() {
                    return;
                }
                if let Err(e) = self.on_success(txn, route, result) {
                    self.reject(e);
                }
            }
            TxnEvent::Error { request, error } => {
                self.routes.remove(&request);
                txn.prevent_default(request);
                self.reject(Error::Engine(error));
            }
            TxnEvent::Abort { error } => {
                let reason = error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "transaction was aborted".to_string());
                self.reject(Error::Aborted { reason });
            }
            TxnEvent::Complete => {
                if self.is_settled() {
                    return;
                }
                if self.results.iter().all(Option::is_some) {
                    self.resolve();
                } else {
                    self.reject(Error::internal(
                        "transaction completed before every group finished",
                    ));
                }
            }
        }
    }

    /// Run to settlement against `target`.
    ///
    /// A transaction opened from a database is drained once the run
    /// settles; a borrowed transaction goes back to the caller with every
    /// request the batch still has queued marked as handled.
    pub fn run(mut self, target: Target<'_, T>) -> Result<Vec<GroupResult>> {
        if let Some(err) = self.invalid.take() {
            return Err(err);
        }
        match target {
            Target::Transaction(txn) => self.drive(txn),
            Target::Database(db) => {
                let mut txn = db.transaction(&self.scope, TransactionMode::ReadWrite)?;
                let outcome = self.drive(&mut txn);
                txn.finish();
                outcome
            }
        }
    }

    fn drive(&mut self, txn: &mut T) -> Result<Vec<GroupResult>> {
        self.start(txn);
        while !self.is_settled() {
            match txn.next_event() {
                Some(event) => self.handle(txn, event),
                None => self.reject(Error::internal(
                    "transaction finished before the batch settled",
                )),
            }
        }
        self.outcome()
            .unwrap_or_else(|| Err(Error::internal("batch outcome already taken")))
    }

    fn on_success(&mut self, txn: &mut T, route: Route, result: OpResult) -> Result<()> {
        let group = match route {
            Route::Step { group, store, step } | Route::Lookup { group, store, step } => {
                let run = match self.groups.get_mut(group) {
                    Some(GroupState::Stores { runs, .. }) => runs.get_mut(store),
                    _ => None,
                }
                .ok_or_else(|| Error::internal(format!("no store run {} in group {}", store, group)))?;
                let mut sub = Submitter::new(txn, &mut self.routes);
                if matches!(route, Route::Step { .. }) {
                    run.on_success(step, result, &mut sub)?;
                } else {
                    run.on_lookup(step, result, &mut sub)?;
                }
                group
            }
            Route::Adapter { group } => {
                debug!(target: "txbatch::batch", group, "Adapter request settled");
                self.results[group] = Some(GroupResult::Adapter(result));
                self.groups[group] = GroupState::Finished;
                group
            }
        };
        self.resume(group, txn)
    }

    fn resume(&mut self, group: usize, txn: &mut T) -> Result<()> {
        match self.dispatch {
            Dispatch::Serial => self.progress(txn),
            Dispatch::Parallel => {
                self.drive_group(group, txn)?;
                self.check_all_done();
                Ok(())
            }
        }
    }

    /// Parallel mode: dispatch every group at once.
    fn start_parallel(&mut self, txn: &mut T) -> Result<()> {
        for g in 0..self.groups.len() {
            self.drive_group(g, txn)?;
        }
        self.check_all_done();
        Ok(())
    }

    /// Serial mode: advance through groups in order until one is waiting.
    fn progress(&mut self, txn: &mut T) -> Result<()> {
        while self.cursor < self.groups.len() {
            if !self.drive_group(self.cursor, txn)? {
                return Ok(());
            }
            self.cursor += 1;
        }
        self.check_all_done();
        Ok(())
    }

    /// Start the group if needed and issue whatever it may issue.
    /// Returns whether the group has finished.
    fn drive_group(&mut self, g: usize, txn: &mut T) -> Result<bool> {
        if matches!(self.groups[g], GroupState::Waiting(_)) {
            self.start_group(g, txn)?;
        }
        let dispatch = self.dispatch;
        let finished = match &mut self.groups[g] {
            GroupState::Waiting(_) => {
                return Err(Error::internal(format!("group {} did not start", g)))
            }
            GroupState::Adapter => false,
            GroupState::Finished => true,
            GroupState::Stores { runs, current } => {
                let mut sub = Submitter::new(txn, &mut self.routes);
                match dispatch {
                    Dispatch::Serial => {
                        while let Some(run) = runs.get_mut(*current) {
                            run.pump(&mut sub)?;
                            if !run.is_done() {
                                break;
                            }
                            *current += 1;
                        }
                        *current == runs.len()
                    }
                    Dispatch::Parallel => {
                        for run in runs.iter_mut() {
                            run.pump(&mut sub)?;
                        }
                        runs.iter().all(StoreRun::is_done)
                    }
                }
            }
        };
        if finished && self.results[g].is_none() {
            self.finish_group(g);
        }
        Ok(finished)
    }

    fn start_group(&mut self, g: usize, txn: &mut T) -> Result<()> {
        let group = match std::mem::replace(&mut self.groups[g], GroupState::Finished) {
            GroupState::Waiting(group) => group,
            other => {
                self.groups[g] = other;
                return Ok(());
            }
        };
        match group.into_kind() {
            GroupKind::Stores(entries) => {
                let mut runs = Vec::with_capacity(entries.len());
                for (index, (name, ops)) in entries.into_iter().enumerate() {
                    let ops = canonicalize(&ops)?;
                    let meta = txn.store(&name)?;
                    debug!(target: "txbatch::store", group = g, store = %name, ops = ops.len(), "Store run created");
                    runs.push(StoreRun::new(
                        g,
                        index,
                        name,
                        meta,
                        ops,
                        self.dispatch,
                        self.options.emulate_unique_indexes,
                    ));
                }
                debug!(target: "txbatch::batch", group = g, stores = runs.len(), "Group started");
                self.groups[g] = GroupState::Stores { runs, current: 0 };
            }
            GroupKind::Adapter(adapter) => {
                let outcome = match self.adapter_cb.as_mut() {
                    Some(cb) => cb(txn, adapter),
                    None => adapter.call(txn),
                }?;
                match outcome {
                    AdapterOutcome::Ready(value) => {
                        debug!(target: "txbatch::batch", group = g, "Adapter ready");
                        self.results[g] = Some(GroupResult::Adapter(value));
                    }
                    AdapterOutcome::Pending(request) => {
                        debug!(target: "txbatch::batch", group = g, request, "Adapter pending");
                        self.routes.insert(request, Route::Adapter { group: g });
                        self.groups[g] = GroupState::Adapter;
                    }
                }
            }
        }
        Ok(())
    }

    fn finish_group(&mut self, g: usize) {
        if let GroupState::Stores { runs, .. } =
            std::mem::replace(&mut self.groups[g], GroupState::Finished)
        {
            let stores: StoreResults = runs
                .into_iter()
                .map(|mut run| (run.name().to_string(), run.take_results()))
                .collect();
            debug!(target: "txbatch::batch", group = g, stores = stores.len(), "Group finished");
            self.results[g] = Some(GroupResult::Stores(stores));
        }
    }

    fn check_all_done(&mut self) {
        if self.options.resolve_early
            && !self.is_settled()
            && self.results.iter().all(Option::is_some)
        {
            self.resolve();
        }
    }

    fn resolve(&mut self) {
        let results: Option<Vec<GroupResult>> = self.results.iter_mut().map(Option::take).collect();
        match results {
            Some(results) => {
                debug!(target: "txbatch::batch", groups = results.len(), "Batch resolved");
                self.settlement = Settlement::Settled(Ok(results));
            }
            None => self.reject(Error::internal("resolved with an unfinished group")),
        }
    }

    /// Once settled, hand every request still outstanding back to the
    /// transaction as handled, so a late failure cannot abort it.
    fn release(&mut self, txn: &mut T) {
        if !self.is_settled() || self.routes.is_empty() {
            return;
        }
        debug!(target: "txbatch::batch", outstanding = self.routes.len(), "Releasing outstanding requests");
        for (request, _) in self.routes.drain() {
            txn.prevent_default(request);
        }
    }

    fn reject(&mut self, error: Error) {
        if self.is_settled() {
            debug!(target: "txbatch::batch", %error, "Ignoring failure after settlement");
            return;
        }
        warn!(target: "txbatch::batch", %error, "Batch rejected");
        self.settlement = Settlement::Settled(Err(error));
    }
}
