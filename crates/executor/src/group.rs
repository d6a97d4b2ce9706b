//! Store groups
//!
//! A batch is an ordered list of groups. A group is either a mapping from
//! store names to operations, processed together, or an adapter: a
//! closure given the live transaction in place of operations.

use std::fmt;
use std::ops::Deref;
use txbatch_core::{Error, Ops, Result, Value};
use txbatch_engine::RequestId;

/// What an adapter produced.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterOutcome {
    /// The adapter's value is known now
    Ready(Option<Value>),
    /// The adapter's value is the result of this request. In serial mode
    /// later groups wait for it.
    Pending(RequestId),
}

type AdapterFn<T> = Box<dyn FnOnce(&mut T) -> Result<AdapterOutcome>>;

/// A closure run against the live transaction in place of an operation
/// group.
pub struct Adapter<T> {
    f: AdapterFn<T>,
}

impl<T> Adapter<T> {
    /// Wrap a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&mut T) -> Result<AdapterOutcome> + 'static,
    {
        Self { f: Box::new(f) }
    }

    /// Run the adapter.
    pub fn call(self, txn: &mut T) -> Result<AdapterOutcome> {
        (self.f)(txn)
    }
}

impl<T> fmt::Debug for Adapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Adapter(..)")
    }
}

#[derive(Debug)]
pub(crate) enum GroupKind<T> {
    Stores(Vec<(String, Ops)>),
    Adapter(Adapter<T>),
}

/// One entry of a batch.
///
/// # Example
///
/// ```text
/// StoreGroup::new()
///     .store("users", vec![Operation::add("u1", json!({"name": "Ann"}))])
///     .store("kv", "clear")
/// ```
#[derive(Debug)]
pub struct StoreGroup<T> {
    kind: GroupKind<T>,
}

impl<T> StoreGroup<T> {
    /// An empty mapping group.
    pub fn new() -> Self {
        Self {
            kind: GroupKind::Stores(Vec::new()),
        }
    }

    /// Add operations for a store. Stores are processed in the order they
    /// were added; naming a store again replaces its operations in place.
    ///
    /// On an adapter group this does nothing.
    pub fn store(mut self, name: impl Into<String>, ops: impl Into<Ops>) -> Self {
        if let GroupKind::Stores(entries) = &mut self.kind {
            let name = name.into();
            let ops = ops.into();
            match entries.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => entry.1 = ops,
                None => entries.push((name, ops)),
            }
        }
        self
    }

    /// An adapter group.
    pub fn adapter<F>(f: F) -> Self
    where
        F: FnOnce(&mut T) -> Result<AdapterOutcome> + 'static,
    {
        Self {
            kind: GroupKind::Adapter(Adapter::new(f)),
        }
    }

    /// A mapping group from a dynamic value: each field names a store and
    /// holds its raw operations, in field order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `value` is not a mapping.
    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = value.as_object().ok_or_else(|| {
            Error::invalid_argument(format!(
                "store group must be a mapping of store names to operations, got {}",
                value.type_name()
            ))
        })?;
        Ok(fields
            .iter()
            .fold(Self::new(), |group, (name, ops)| {
                group.store(name.as_str(), Ops::Raw(ops.clone()))
            }))
    }

    /// Whether this is an adapter group.
    pub fn is_adapter(&self) -> bool {
        matches!(self.kind, GroupKind::Adapter(_))
    }

    /// Store names in processing order; none for an adapter.
    pub fn store_names(&self) -> impl Iterator<Item = &str> {
        let entries: &[(String, Ops)] = match &self.kind {
            GroupKind::Stores(entries) => entries,
            GroupKind::Adapter(_) => &[],
        };
        entries.iter().map(|(name, _)| name.as_str())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.store_names().any(str::is_empty) {
            return Err(Error::invalid_argument("store name must not be empty"));
        }
        Ok(())
    }

    pub(crate) fn into_kind(self) -> GroupKind<T> {
        self.kind
    }
}

impl<T> Default for StoreGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The groups of a batch, in order.
///
/// A single group converts into a one-element batch.
#[derive(Debug)]
pub struct Groups<T>(Vec<StoreGroup<T>>);

impl<T> Groups<T> {
    /// Groups from a dynamic value: a mapping is one group, a list holds
    /// one mapping per group.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for anything else, or for a list
    /// element that is not a mapping.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(_) => Ok(Groups(vec![StoreGroup::from_value(value)?])),
            Value::Array(items) => items
                .iter()
                .map(StoreGroup::from_value)
                .collect::<Result<Vec<_>>>()
                .map(Groups),
            other => Err(Error::invalid_argument(format!(
                "groups must be a mapping or a list of mappings, got {}",
                other.type_name()
            ))),
        }
    }

    pub(crate) fn into_inner(self) -> Vec<StoreGroup<T>> {
        self.0
    }
}

impl<T> Deref for Groups<T> {
    type Target = [StoreGroup<T>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> From<StoreGroup<T>> for Groups<T> {
    fn from(group: StoreGroup<T>) -> Self {
        Groups(vec![group])
    }
}

impl<T> From<Vec<StoreGroup<T>>> for Groups<T> {
    fn from(groups: Vec<StoreGroup<T>>) -> Self {
        Groups(groups)
    }
}
