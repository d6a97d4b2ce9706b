//! Single-store executor
//!
//! A `StoreRun` walks one store's canonical operations and turns each into
//! engine requests. The operation list itself is never touched; requests
//! are issued from an append-only buffer of steps:
//!
//! | Operation | Steps |
//! |-----------|-------|
//! | `clear` | `Clear` |
//! | `del` | `Delete(key)` |
//! | `add` / `put` | `Write` (after an optional unique check) |
//! | `copy` | `Read(from)`, then `Write(key)` once the read succeeds |
//! | `move` | `Read(from)`, then `Write(key)` and `Delete(from)` |
//!
//! Each operation counts its outstanding steps. A read that expands into
//! more steps adds them before it is counted done, so the store is done
//! exactly when every operation has been translated and none has
//! outstanding steps.
//!
//! Serial dispatch issues the next step only once nothing is in flight;
//! parallel dispatch issues every step as soon as it exists. A write that
//! needs a unique check is held until every earlier checked write of the
//! store has been submitted, so its lookups observe those writes.

use crate::submit::{Route, Submitter};
use crate::unique::{self, UniqueCheck};
use tracing::{debug, trace, warn};
use txbatch_core::{Error, Key, OpResult, Operation, Result, Value};
use txbatch_engine::{Request, StoreMeta, Transaction, WriteMode};

/// When the next step may be issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// After the previous step has succeeded
    Serial,
    /// Immediately
    Parallel,
}

#[derive(Debug, Clone, PartialEq)]
enum StepAction {
    Clear,
    Delete(Key),
    Read { from: Key },
    Write {
        mode: WriteMode,
        key: Option<Key>,
        value: Value,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum StepState {
    Queued,
    /// Waiting for an earlier unique check of this store
    Held,
    Checking(UniqueCheck),
    InFlight,
    Done,
}

#[derive(Debug, Clone)]
struct Step {
    op: usize,
    action: StepAction,
    /// Whether the step's result is the operation's result
    records: bool,
    state: StepState,
}

pub(crate) struct StoreRun {
    group: usize,
    index: usize,
    name: String,
    meta: StoreMeta,
    dispatch: Dispatch,
    emulate_unique: bool,
    ops: Vec<Operation>,
    op_cursor: usize,
    steps: Vec<Step>,
    next_step: usize,
    in_flight: usize,
    outstanding: Vec<usize>,
    results: Vec<OpResult>,
}

impl StoreRun {
    pub(crate) fn new(
        group: usize,
        index: usize,
        name: String,
        meta: StoreMeta,
        ops: Vec<Operation>,
        dispatch: Dispatch,
        emulate_unique: bool,
    ) -> Self {
        let count = ops.len();
        Self {
            group,
            index,
            name,
            meta,
            dispatch,
            emulate_unique,
            ops,
            op_cursor: 0,
            steps: Vec::with_capacity(count),
            next_step: 0,
            in_flight: 0,
            outstanding: vec![0; count],
            results: vec![None; count],
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Every operation translated, none with outstanding steps.
    pub(crate) fn is_done(&self) -> bool {
        self.op_cursor == self.ops.len() && self.outstanding.iter().all(|n| *n == 0)
    }

    /// Results in original operation order.
    pub(crate) fn take_results(&mut self) -> Vec<OpResult> {
        std::mem::take(&mut self.results)
    }

    /// Issue every step the dispatch policy currently allows.
    pub(crate) fn pump<T: Transaction>(&mut self, sub: &mut Submitter<'_, T>) -> Result<()> {
        loop {
            if self.dispatch == Dispatch::Serial && self.in_flight > 0 {
                return Ok(());
            }
            if self.next_step == self.steps.len() {
                if self.op_cursor == self.ops.len() {
                    return Ok(());
                }
                self.translate_next();
                continue;
            }
            let step = self.next_step;
            self.next_step += 1;
            self.in_flight += 1;
            self.dispatch_step(step, sub)?;
        }
    }

    /// A step's request succeeded.
    pub(crate) fn on_success<T: Transaction>(
        &mut self,
        step: usize,
        result: OpResult,
        sub: &mut Submitter<'_, T>,
    ) -> Result<()> {
        let entry = self.steps.get_mut(step).ok_or_else(|| {
            Error::internal(format!("store '{}' has no step {}", self.name, step))
        })?;
        if entry.state != StepState::InFlight {
            return Err(Error::internal(format!(
                "step {} of store '{}' was not in flight",
                step, self.name
            )));
        }
        entry.state = StepState::Done;
        let op = entry.op;
        let records = entry.records;
        let read_from = match &entry.action {
            StepAction::Read { from } => Some(from.clone()),
            _ => None,
        };
        self.in_flight -= 1;

        match read_from {
            Some(from) => {
                let value = result.ok_or_else(|| Error::MissingSource {
                    store: self.name.clone(),
                    key: from,
                })?;
                self.expand(op, value)?;
            }
            None if records => self.results[op] = result,
            None => {}
        }
        self.outstanding[op] -= 1;
        trace!(target: "txbatch::store", store = %self.name, op, step, "Step done");
        self.pump(sub)
    }

    /// A unique-index lookup for a pending write answered.
    pub(crate) fn on_lookup<T: Transaction>(
        &mut self,
        step: usize,
        owner: OpResult,
        sub: &mut Submitter<'_, T>,
    ) -> Result<()> {
        let check = match self.steps.get_mut(step).map(|s| &mut s.state) {
            Some(StepState::Checking(check)) => check,
            _ => {
                return Err(Error::internal(format!(
                    "step {} of store '{}' is not checking unique indexes",
                    step, self.name
                )))
            }
        };
        if !check.on_lookup(owner) {
            return Ok(());
        }
        let conflicts = check.conflicts();
        if conflicts > 0 {
            warn!(target: "txbatch::unique", store = %self.name, step, conflicts, "Write refused by unique index");
            return Err(Error::ConstraintViolation {
                store: self.name.clone(),
                conflicts,
            });
        }
        self.submit_write(step, sub)?;
        self.release_held(sub)
    }

    fn push_step(&mut self, op: usize, action: StepAction, records: bool) {
        self.steps.push(Step {
            op,
            action,
            records,
            state: StepState::Queued,
        });
        self.outstanding[op] += 1;
    }

    /// Value to write with an out-of-band key placed at the store's key
    /// path, when it has one.
    fn prepare(&self, mut value: Value, key: Option<&Key>) -> Value {
        if let (Some(path), Some(key)) = (&self.meta.key_path, key) {
            if !path.inject(&mut value, key) {
                trace!(target: "txbatch::store", store = %self.name, %path, "Key not injectable, left to the engine");
            }
        }
        value
    }

    fn translate_next(&mut self) {
        let op = self.op_cursor;
        self.op_cursor += 1;
        let (action, records) = match &self.ops[op] {
            Operation::Clear => (StepAction::Clear, true),
            Operation::Del { key } => (StepAction::Delete(key.clone()), true),
            Operation::Move { from, .. } | Operation::Copy { from, .. } => {
                (StepAction::Read { from: from.clone() }, false)
            }
            Operation::Add { key, value } => (
                StepAction::Write {
                    mode: WriteMode::Add,
                    key: key.clone(),
                    value: self.prepare(value.clone(), key.as_ref()),
                },
                true,
            ),
            Operation::Put { key, value } => (
                StepAction::Write {
                    mode: WriteMode::Put,
                    key: key.clone(),
                    value: self.prepare(value.clone(), key.as_ref()),
                },
                true,
            ),
        };
        self.push_step(op, action, records);
    }

    /// Turn a finished move/copy read into its dependent steps.
    fn expand(&mut self, op: usize, value: Value) -> Result<()> {
        let (key, delete) = match &self.ops[op] {
            Operation::Move { key, from } => (key.clone(), Some(from.clone())),
            Operation::Copy { key, .. } => (key.clone(), None),
            other => {
                return Err(Error::internal(format!(
                    "read step for non-derived operation {}",
                    other.op_type()
                )))
            }
        };
        debug!(target: "txbatch::store", store = %self.name, op, to = %key, moved = delete.is_some(), "Expanding derived operation");
        let value = self.prepare(value, Some(&key));
        self.push_step(
            op,
            StepAction::Write {
                mode: WriteMode::Put,
                key: Some(key),
                value,
            },
            true,
        );
        if let Some(from) = delete {
            self.push_step(op, StepAction::Delete(from), false);
        }
        Ok(())
    }

    fn route(&self, step: usize) -> Route {
        Route::Step {
            group: self.group,
            store: self.index,
            step,
        }
    }

    fn dispatch_step<T: Transaction>(
        &mut self,
        step: usize,
        sub: &mut Submitter<'_, T>,
    ) -> Result<()> {
        let store = self.name.clone();
        let request = match &self.steps[step].action {
            StepAction::Clear => Request::Clear { store },
            StepAction::Delete(key) => Request::Delete {
                store,
                key: key.clone(),
            },
            StepAction::Read { from } => Request::Get {
                store,
                key: from.clone(),
            },
            StepAction::Write { .. } => return self.dispatch_write(step, sub),
        };
        trace!(target: "txbatch::store", store = %self.name, step, kind = ?request.kind(), "Dispatching step");
        sub.submit(request, self.route(step))?;
        self.steps[step].state = StepState::InFlight;
        Ok(())
    }

    fn dispatch_write<T: Transaction>(
        &mut self,
        step: usize,
        sub: &mut Submitter<'_, T>,
    ) -> Result<()> {
        if self.emulate_unique {
            let (key, value) = match &self.steps[step].action {
                StepAction::Write { key, value, .. } => (key, value),
                _ => return Err(Error::internal("unique check on a non-write step")),
            };
            let own_key = key
                .clone()
                .or_else(|| self.meta.key_path.as_ref().and_then(|p| p.extract(value)));
            let candidates = unique::candidates(&self.meta, value);
            let blocked = self.steps[..step]
                .iter()
                .any(|s| matches!(s.state, StepState::Held | StepState::Checking(_)));
            if !candidates.is_empty() && blocked {
                trace!(target: "txbatch::unique", store = %self.name, step, "Unique check held behind an earlier write");
                self.steps[step].state = StepState::Held;
                return Ok(());
            }
            if !candidates.is_empty() {
                let awaiting = candidates.len();
                for candidate in candidates {
                    trace!(target: "txbatch::unique", store = %self.name, index = %candidate.index, key = %candidate.key, "Looking up unique owner");
                    sub.submit(
                        Request::IndexGetKey {
                            store: self.name.clone(),
                            index: candidate.index,
                            key: candidate.key,
                        },
                        Route::Lookup {
                            group: self.group,
                            store: self.index,
                            step,
                        },
                    )?;
                }
                self.steps[step].state = StepState::Checking(UniqueCheck::new(own_key, awaiting));
                return Ok(());
            }
        }
        self.submit_write(step, sub)
    }

    /// Start the held unique checks that no earlier check blocks any more.
    fn release_held<T: Transaction>(&mut self, sub: &mut Submitter<'_, T>) -> Result<()> {
        for step in 0..self.steps.len() {
            match self.steps[step].state {
                StepState::Checking(_) => return Ok(()),
                StepState::Held => {
                    self.dispatch_write(step, sub)?;
                    if matches!(self.steps[step].state, StepState::Checking(_)) {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn submit_write<T: Transaction>(
        &mut self,
        step: usize,
        sub: &mut Submitter<'_, T>,
    ) -> Result<()> {
        let route = self.route(step);
        let entry = &mut self.steps[step];
        let request = match &entry.action {
            StepAction::Write { mode, key, value } => Request::Write {
                store: self.name.clone(),
                mode: *mode,
                value: value.clone(),
                // stores with a key path carry the key inside the value
                key: if self.meta.key_path.is_some() {
                    None
                } else {
                    key.clone()
                },
            },
            _ => return Err(Error::internal("write submitted for a non-write step")),
        };
        trace!(target: "txbatch::store", store = %self.name, step, kind = ?request.kind(), "Dispatching step");
        sub.submit(request, route)?;
        entry.state = StepState::InFlight;
        Ok(())
    }
}
