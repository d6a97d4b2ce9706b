//! Store and index declarations for the in-memory engine

use crate::transaction_ops::{IndexMeta, StoreMeta};
use txbatch_core::KeyPath;

/// Declaration of an index on a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    name: String,
    key_path: KeyPath,
    unique: bool,
}

impl IndexSchema {
    /// A non-unique index over `key_path`.
    pub fn new(name: impl Into<String>, key_path: impl Into<KeyPath>) -> Self {
        Self {
            name: name.into(),
            key_path: key_path.into(),
            unique: false,
        }
    }

    /// Flag the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub(crate) fn meta(&self) -> IndexMeta {
        IndexMeta {
            name: self.name.clone(),
            key_path: self.key_path.clone(),
            unique: self.unique,
        }
    }
}

/// Declaration of an object store.
///
/// # Example
///
/// ```text
/// StoreSchema::new("users")
///     .key_path("id")
///     .index(IndexSchema::new("by_email", "email").unique())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSchema {
    name: String,
    key_path: Option<KeyPath>,
    auto_increment: bool,
    indexes: Vec<IndexSchema>,
}

impl StoreSchema {
    /// A store with out-of-band keys and no indexes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_path: None,
            auto_increment: false,
            indexes: Vec::new(),
        }
    }

    /// Derive keys from values at `key_path`.
    pub fn key_path(mut self, key_path: impl Into<KeyPath>) -> Self {
        self.key_path = Some(key_path.into());
        self
    }

    /// Generate integer keys for records written without one.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Declare an index.
    pub fn index(mut self, index: IndexSchema) -> Self {
        self.indexes.push(index);
        self
    }

    /// Store name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn key_path_ref(&self) -> Option<&KeyPath> {
        self.key_path.as_ref()
    }

    pub(crate) fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub(crate) fn indexes(&self) -> &[IndexSchema] {
        &self.indexes
    }

    pub(crate) fn meta(&self) -> StoreMeta {
        StoreMeta {
            name: self.name.clone(),
            key_path: self.key_path.clone(),
            auto_increment: self.auto_increment,
            indexes: self.indexes.iter().map(IndexSchema::meta).collect(),
        }
    }
}

impl IndexSchema {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn key_path(&self) -> &KeyPath {
        &self.key_path
    }

    pub(crate) fn is_unique(&self) -> bool {
        self.unique
    }
}
