//! Record keys and key paths
//!
//! A [`Key`] identifies one record inside a store. Only a subset of
//! [`Value`]s are valid keys: integers, strings, byte strings, and arrays
//! of valid keys. Keys collate by variant first (`Int < String < Bytes <
//! Array`) and then by content, which is exactly the derived `Ord`.
//!
//! A [`KeyPath`] names where a key lives inside a stored value. Stores
//! with a key path derive their primary key from the value; indexes use a
//! key path to derive their index key.

use crate::value::{Object, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A valid record key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Integer key
    Int(i64),
    /// String key
    String(String),
    /// Binary key
    Bytes(Vec<u8>),
    /// Array key (compound indexes produce these)
    Array(Vec<Key>),
}

impl Key {
    /// Convert a value into a key, if the value is a valid key.
    ///
    /// Arrays are valid only when every element is a valid key.
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::Int(i) => Some(Key::Int(*i)),
            Value::String(s) => Some(Key::String(s.clone())),
            Value::Bytes(b) => Some(Key::Bytes(b.clone())),
            Value::Array(items) => items
                .iter()
                .map(Key::from_value)
                .collect::<Option<Vec<_>>>()
                .map(Key::Array),
            _ => None,
        }
    }

    /// Convert the key back into a value.
    pub fn to_value(&self) -> Value {
        match self {
            Key::Int(i) => Value::Int(*i),
            Key::String(s) => Value::String(s.clone()),
            Key::Bytes(b) => Value::Bytes(b.clone()),
            Key::Array(items) => Value::Array(items.iter().map(Key::to_value).collect()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::String(s) => write!(f, "{:?}", s),
            Key::Bytes(b) => write!(f, "bytes[{}]", b.len()),
            Key::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Int(i as i64)
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        key.to_value()
    }
}

/// Location of a key inside a stored value.
///
/// Each path is a dotted field path such as `"id"` or `"profile.email"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyPath {
    /// One path producing a scalar key
    Single(String),
    /// Several paths producing an array key, in order
    Compound(Vec<String>),
}

impl KeyPath {
    /// Build a single key path.
    pub fn single(path: impl Into<String>) -> Self {
        KeyPath::Single(path.into())
    }

    /// Build a compound key path.
    pub fn compound<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyPath::Compound(paths.into_iter().map(Into::into).collect())
    }

    /// Whether the key path has more than one component.
    pub fn is_compound(&self) -> bool {
        matches!(self, KeyPath::Compound(_))
    }

    /// The component paths, in order.
    pub fn paths(&self) -> Vec<&str> {
        match self {
            KeyPath::Single(p) => vec![p.as_str()],
            KeyPath::Compound(ps) => ps.iter().map(String::as_str).collect(),
        }
    }

    /// Evaluate the key path against a value as the engine does.
    ///
    /// A single path yields the key at that path; a compound path yields an
    /// array key and requires every component to be present and valid.
    pub fn extract(&self, value: &Value) -> Option<Key> {
        match self {
            KeyPath::Single(p) => lookup(value, p).and_then(Key::from_value),
            KeyPath::Compound(ps) => ps
                .iter()
                .map(|p| lookup(value, p).and_then(Key::from_value))
                .collect::<Option<Vec<_>>>()
                .map(Key::Array),
        }
    }

    /// Write `key` into `value` at a single key path, creating
    /// intermediate objects as needed.
    ///
    /// Returns `false` when the key cannot be placed: compound paths, or a
    /// value (or intermediate field) that is not an object.
    pub fn inject(&self, value: &mut Value, key: &Key) -> bool {
        let path = match self {
            KeyPath::Single(p) => p,
            KeyPath::Compound(_) => return false,
        };
        let mut segments = path.split('.').peekable();
        let mut current = value;
        while let Some(segment) = segments.next() {
            let object = match current {
                Value::Object(o) => o,
                _ => return false,
            };
            if segments.peek().is_none() {
                object.insert(segment.to_string(), key.to_value());
                return true;
            }
            current = object
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Object::new()));
        }
        false
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPath::Single(p) => write!(f, "{}", p),
            KeyPath::Compound(ps) => write!(f, "[{}]", ps.join(", ")),
        }
    }
}

impl From<&str> for KeyPath {
    fn from(path: &str) -> Self {
        KeyPath::Single(path.to_string())
    }
}

/// Resolve a dotted field path inside a value.
pub fn lookup<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
}
