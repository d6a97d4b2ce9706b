//! Record storage for one object store
//!
//! A `StoreState` is plain data: transactions clone the states in their
//! scope, mutate the clones, and publish them back on commit.

use super::schema::StoreSchema;
use crate::transaction_ops::WriteMode;
use std::collections::BTreeMap;
use txbatch_core::{EngineError, Key, Value};

#[derive(Debug, Clone)]
pub(crate) struct StoreState {
    pub(crate) schema: StoreSchema,
    pub(crate) records: BTreeMap<Key, Value>,
    next_key: i64,
}

impl StoreState {
    pub(crate) fn new(schema: StoreSchema) -> Self {
        Self {
            schema,
            records: BTreeMap::new(),
            next_key: 1,
        }
    }

    pub(crate) fn get(&self, key: &Key) -> Option<Value> {
        self.records.get(key).cloned()
    }

    pub(crate) fn delete(&mut self, key: &Key) {
        self.records.remove(key);
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }

    /// Resolve the key of a record about to be written.
    fn resolve_key(&mut self, value: &mut Value, key: Option<Key>) -> Result<Key, EngineError> {
        let name = self.schema.name().to_string();
        match (self.schema.key_path_ref().cloned(), key) {
            (Some(_), Some(_)) => Err(EngineError::data(format!(
                "store '{}' uses in-line keys and a key was supplied",
                name
            ))),
            (Some(path), None) => {
                if let Some(key) = path.extract(value) {
                    return Ok(key);
                }
                if !self.schema.is_auto_increment() {
                    return Err(EngineError::data(format!(
                        "value has no key at path '{}' in store '{}'",
                        path, name
                    )));
                }
                let key = Key::Int(self.next_key);
                if !path.inject(value, &key) {
                    return Err(EngineError::data(format!(
                        "generated key cannot be placed at path '{}' in store '{}'",
                        path, name
                    )));
                }
                Ok(key)
            }
            (None, Some(key)) => Ok(key),
            (None, None) if self.schema.is_auto_increment() => Ok(Key::Int(self.next_key)),
            (None, None) => Err(EngineError::data(format!(
                "store '{}' uses out-of-line keys and no key was supplied",
                name
            ))),
        }
    }

    /// Write a record, enforcing key and (optionally) unique-index rules.
    pub(crate) fn write(
        &mut self,
        mode: WriteMode,
        mut value: Value,
        key: Option<Key>,
        native_unique: bool,
    ) -> Result<Key, EngineError> {
        let key = self.resolve_key(&mut value, key)?;

        if mode == WriteMode::Add && self.records.contains_key(&key) {
            return Err(EngineError::constraint(format!(
                "key {} already exists in store '{}'",
                key,
                self.schema.name()
            )));
        }

        if native_unique {
            for index in self.schema.indexes().iter().filter(|i| i.is_unique()) {
                let Some(index_key) = index.key_path().extract(&value) else {
                    continue;
                };
                let taken = self.records.iter().any(|(pk, record)| {
                    *pk != key && index.key_path().extract(record).as_ref() == Some(&index_key)
                });
                if taken {
                    return Err(EngineError::constraint(format!(
                        "unique index '{}' already holds {} in store '{}'",
                        index.name(),
                        index_key,
                        self.schema.name()
                    )));
                }
            }
        }

        if let Key::Int(i) = key {
            if self.schema.is_auto_increment() && i >= self.next_key {
                self.next_key = i.saturating_add(1);
            }
        }
        self.records.insert(key.clone(), value);
        Ok(key)
    }

    /// Primary key of the first record (in key order) whose index key is
    /// `index_key`.
    pub(crate) fn index_get_key(
        &self,
        index: &str,
        index_key: &Key,
    ) -> Result<Option<Key>, EngineError> {
        let index = self
            .schema
            .indexes()
            .iter()
            .find(|i| i.name() == index)
            .ok_or_else(|| {
                EngineError::not_found(format!(
                    "no index '{}' on store '{}'",
                    index,
                    self.schema.name()
                ))
            })?;
        Ok(self
            .records
            .iter()
            .find(|(_, record)| index.key_path().extract(record).as_ref() == Some(index_key))
            .map(|(pk, _)| pk.clone()))
    }
}
