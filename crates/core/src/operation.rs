//! Typed operation records
//!
//! An [`Operation`] is one logical mutation against a single store. Every
//! variant carries exactly the fields its type requires, so a canonical
//! operation list can never hold a half-formed record.

use crate::error::{Error, Result};
use crate::key::Key;
use crate::value::{Object, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpType {
    /// Insert, failing if the key exists
    Add,
    /// Upsert
    Put,
    /// Delete by key
    Del,
    /// Read a source record, write it under a new key, delete the source
    Move,
    /// Read a source record and write it under a new key
    Copy,
    /// Remove every record in the store
    Clear,
}

impl OpType {
    /// All operation kinds, in declaration order.
    pub const ALL: [OpType; 6] = [
        OpType::Add,
        OpType::Put,
        OpType::Del,
        OpType::Move,
        OpType::Copy,
        OpType::Clear,
    ];

    /// Wire name of the operation kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            OpType::Add => "add",
            OpType::Put => "put",
            OpType::Del => "del",
            OpType::Move => "move",
            OpType::Copy => "copy",
            OpType::Clear => "clear",
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        OpType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::invalid_ops(format!("invalid type \"{}\"", s)))
    }
}

/// One logical mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Insert `value`; `key` is required unless the store derives keys
    Add {
        /// Out-of-band key
        key: Option<Key>,
        /// Record to write
        value: Value,
    },
    /// Upsert `value`; `key` is required unless the store derives keys
    Put {
        /// Out-of-band key
        key: Option<Key>,
        /// Record to write
        value: Value,
    },
    /// Delete the record at `key`
    Del {
        /// Key to delete
        key: Key,
    },
    /// Move the record at `from` to `key`
    Move {
        /// Destination key
        key: Key,
        /// Source key
        from: Key,
    },
    /// Copy the record at `from` to `key`
    Copy {
        /// Destination key
        key: Key,
        /// Source key
        from: Key,
    },
    /// Remove every record
    Clear,
}

impl Operation {
    /// Upsert `value` under `key`.
    pub fn put(key: impl Into<Key>, value: impl Into<Value>) -> Self {
        Operation::Put {
            key: Some(key.into()),
            value: value.into(),
        }
    }

    /// Upsert `value`, letting the store derive the key.
    pub fn put_value(value: impl Into<Value>) -> Self {
        Operation::Put {
            key: None,
            value: value.into(),
        }
    }

    /// Insert `value` under `key`.
    pub fn add(key: impl Into<Key>, value: impl Into<Value>) -> Self {
        Operation::Add {
            key: Some(key.into()),
            value: value.into(),
        }
    }

    /// Insert `value`, letting the store derive the key.
    pub fn add_value(value: impl Into<Value>) -> Self {
        Operation::Add {
            key: None,
            value: value.into(),
        }
    }

    /// Delete the record at `key`.
    pub fn del(key: impl Into<Key>) -> Self {
        Operation::Del { key: key.into() }
    }

    /// Move the record at `from` to `to`.
    pub fn move_record(from: impl Into<Key>, to: impl Into<Key>) -> Self {
        Operation::Move {
            key: to.into(),
            from: from.into(),
        }
    }

    /// Copy the record at `from` to `to`.
    pub fn copy_record(from: impl Into<Key>, to: impl Into<Key>) -> Self {
        Operation::Copy {
            key: to.into(),
            from: from.into(),
        }
    }

    /// The operation kind.
    pub fn op_type(&self) -> OpType {
        match self {
            Operation::Add { .. } => OpType::Add,
            Operation::Put { .. } => OpType::Put,
            Operation::Del { .. } => OpType::Del,
            Operation::Move { .. } => OpType::Move,
            Operation::Copy { .. } => OpType::Copy,
            Operation::Clear => OpType::Clear,
        }
    }

    /// The target key, if the operation names one.
    pub fn key(&self) -> Option<&Key> {
        match self {
            Operation::Add { key, .. } | Operation::Put { key, .. } => key.as_ref(),
            Operation::Del { key } | Operation::Move { key, .. } | Operation::Copy { key, .. } => {
                Some(key)
            }
            Operation::Clear => None,
        }
    }

    /// Render the operation as a canonical record value
    /// (`{"type", "key", "value"}`); move and copy carry the source key in
    /// `value`.
    pub fn to_value(&self) -> Value {
        let mut record = Object::new();
        record.insert("type".to_string(), Value::from(self.op_type().as_str()));
        match self {
            Operation::Add { key, value } | Operation::Put { key, value } => {
                if let Some(key) = key {
                    record.insert("key".to_string(), key.to_value());
                }
                record.insert("value".to_string(), value.clone());
            }
            Operation::Del { key } => {
                record.insert("key".to_string(), key.to_value());
            }
            Operation::Move { key, from } | Operation::Copy { key, from } => {
                record.insert("key".to_string(), key.to_value());
                record.insert("value".to_string(), from.to_value());
            }
            Operation::Clear => {}
        }
        Value::Object(record)
    }
}
