//! Request routing
//!
//! Every request the batch submits is recorded against its owner so the
//! orchestrator can hand the matching event back to it.

use std::collections::HashMap;
use txbatch_core::Result;
use txbatch_engine::{Request, RequestId, Transaction};

/// Who is waiting on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Route {
    /// A step of a store run
    Step {
        group: usize,
        store: usize,
        step: usize,
    },
    /// A unique-index lookup made before a write step
    Lookup {
        group: usize,
        store: usize,
        step: usize,
    },
    /// The request an adapter group returned as pending
    Adapter { group: usize },
}

/// Submits requests and records their routes.
pub(crate) struct Submitter<'a, T: Transaction> {
    txn: &'a mut T,
    routes: &'a mut HashMap<RequestId, Route>,
}

impl<'a, T: Transaction> Submitter<'a, T> {
    pub(crate) fn new(txn: &'a mut T, routes: &'a mut HashMap<RequestId, Route>) -> Self {
        Self { txn, routes }
    }

    pub(crate) fn submit(&mut self, request: Request, route: Route) -> Result<RequestId> {
        let id = self.txn.submit(request)?;
        self.routes.insert(id, route);
        Ok(id)
    }
}
