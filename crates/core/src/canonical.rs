//! Operation canonicalizer
//!
//! Callers describe a store's operations in one of three shorthand forms:
//!
//! ```text
//! // 1. A list of records, or of `{ <type>: payload }` wrappers
//! [
//!   { "type": "add", "key": "key1", "value": "val1" },
//!   { "type": "del", "key": "key3" },
//!   { "put": [{ "key": "a", "value": 1 }, { "key": "b", "value": 2 }] },
//!   { "del": { "key": "c" } },
//! ]
//!
//! // 2. A mapping from key to value; null deletes, anything else puts
//! { "key1": "val1", "key3": null }
//!
//! // 3. The literal token
//! "clear"
//! ```
//!
//! [`canonicalize`] turns any of these into an ordered `Vec<Operation>`.
//! It never mutates its input, and canonicalizing an already canonical
//! list yields the same list.

use crate::error::{Error, Result};
use crate::key::Key;
use crate::operation::{OpType, Operation};
use crate::value::{Object, Value};

/// Fields a record may carry besides `type`.
const RECORD_FIELDS: [&str; 3] = ["key", "value", "val"];

/// The token standing for a single `clear` operation.
pub const CLEAR_TOKEN: &str = "clear";

/// Operations for one store, as supplied by a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Ops {
    /// Already typed operations
    Canonical(Vec<Operation>),
    /// A raw shorthand description
    Raw(Value),
}

impl Ops {
    /// The `clear` shorthand.
    pub fn clear() -> Self {
        Ops::Raw(Value::from(CLEAR_TOKEN))
    }
}

impl From<Vec<Operation>> for Ops {
    fn from(ops: Vec<Operation>) -> Self {
        Ops::Canonical(ops)
    }
}

impl From<Operation> for Ops {
    fn from(op: Operation) -> Self {
        Ops::Canonical(vec![op])
    }
}

impl From<Value> for Ops {
    fn from(value: Value) -> Self {
        Ops::Raw(value)
    }
}

impl From<serde_json::Value> for Ops {
    fn from(value: serde_json::Value) -> Self {
        Ops::Raw(Value::from(value))
    }
}

impl From<&str> for Ops {
    fn from(token: &str) -> Self {
        Ops::Raw(Value::from(token))
    }
}

/// Canonicalize an operation group into an ordered operation list.
///
/// # Errors
///
/// Returns [`Error::InvalidOps`] when the input is not the `clear` token,
/// a list, or a mapping; when a list element is not a record; when a type
/// is not one of the six kinds; or when a record lacks a field its type
/// requires.
pub fn canonicalize(ops: &Ops) -> Result<Vec<Operation>> {
    match ops {
        Ops::Canonical(list) => Ok(list.clone()),
        Ops::Raw(raw) => canonicalize_value(raw),
    }
}

/// Canonicalize a raw shorthand description.
pub fn canonicalize_value(raw: &Value) -> Result<Vec<Operation>> {
    match raw {
        Value::String(token) if token == CLEAR_TOKEN => Ok(vec![Operation::Clear]),
        Value::Array(elements) => {
            let mut out = Vec::with_capacity(elements.len());
            for element in elements {
                expand_element(element, &mut out)?;
            }
            Ok(out)
        }
        Value::Object(mapping) => Ok(mapping
            .iter()
            .map(|(key, value)| match value {
                Value::Null => Operation::Del {
                    key: Key::String(key.clone()),
                },
                other => Operation::Put {
                    key: Some(Key::String(key.clone())),
                    value: other.clone(),
                },
            })
            .collect()),
        other => Err(Error::invalid_ops(format!(
            "expected \"clear\", a list or a mapping, got {}",
            other.type_name()
        ))),
    }
}

fn expand_element(element: &Value, out: &mut Vec<Operation>) -> Result<()> {
    let fields = element
        .as_object()
        .ok_or_else(|| Error::invalid_ops(format!("invalid op: {}", element.type_name())))?;

    // `{ <type>: payload }` wrapper
    if fields.len() == 1 {
        if let Some((wrapper, payload)) = fields.iter().next() {
            if wrapper != "type" {
                let op_type: OpType = wrapper.parse()?;
                return expand_wrapper(op_type, payload, out);
            }
        }
    }

    let op_type = match fields.get("type") {
        Some(Value::String(t)) => t.parse::<OpType>()?,
        Some(other) => {
            return Err(Error::invalid_ops(format!(
                "invalid type {}",
                other.type_name()
            )))
        }
        None => return Err(Error::invalid_ops("invalid type \"undefined\"")),
    };
    out.push(parse_record(op_type, fields)?);
    Ok(())
}

fn expand_wrapper(op_type: OpType, payload: &Value, out: &mut Vec<Operation>) -> Result<()> {
    match payload {
        Value::Array(records) => {
            for record in records {
                let fields = record.as_object().ok_or_else(|| {
                    Error::invalid_ops(format!("invalid {} record: {}", op_type, record.type_name()))
                })?;
                check_nested_type(op_type, fields)?;
                out.push(parse_record(op_type, fields)?);
            }
            Ok(())
        }
        Value::Object(fields) if is_single_record(fields) => {
            check_nested_type(op_type, fields)?;
            out.push(parse_record(op_type, fields)?);
            Ok(())
        }
        Value::Object(pairs) => {
            for (key, value) in pairs {
                let mut record = Object::new();
                record.insert("key".to_string(), Value::String(key.clone()));
                record.insert("value".to_string(), value.clone());
                out.push(parse_record(op_type, &record)?);
            }
            Ok(())
        }
        Value::Null if op_type == OpType::Clear => {
            out.push(Operation::Clear);
            Ok(())
        }
        other => Err(Error::invalid_ops(format!(
            "invalid {} payload: {}",
            op_type,
            other.type_name()
        ))),
    }
}

fn is_single_record(fields: &Object) -> bool {
    fields
        .keys()
        .all(|f| f == "type" || RECORD_FIELDS.contains(&f.as_str()))
}

fn check_nested_type(op_type: OpType, fields: &Object) -> Result<()> {
    match fields.get("type") {
        None => Ok(()),
        Some(Value::String(t)) if t == op_type.as_str() => Ok(()),
        Some(Value::String(t)) => {
            // an unknown nested name reports as an invalid type first
            t.parse::<OpType>()?;
            Err(Error::invalid_ops(format!(
                "nested type \"{}\" inside \"{}\" wrapper",
                t, op_type
            )))
        }
        Some(other) => Err(Error::invalid_ops(format!(
            "invalid nested type {}",
            other.type_name()
        ))),
    }
}

fn parse_record(op_type: OpType, fields: &Object) -> Result<Operation> {
    let key = match fields.get("key") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(Key::from_value(raw).ok_or_else(|| {
            Error::invalid_ops(format!("invalid key for {}: {}", op_type, raw.type_name()))
        })?),
    };
    // `val` wins over `value` when both are present
    let value = ["val", "value"]
        .iter()
        .find_map(|name| fields.get(*name).filter(|v| !v.is_null()));

    let require_key = |key: Option<Key>| {
        key.ok_or_else(|| Error::invalid_ops(format!("{} requires a key", op_type)))
    };

    match op_type {
        OpType::Add | OpType::Put => {
            let value = value
                .cloned()
                .ok_or_else(|| Error::invalid_ops(format!("{} requires a value", op_type)))?;
            Ok(if op_type == OpType::Add {
                Operation::Add { key, value }
            } else {
                Operation::Put { key, value }
            })
        }
        OpType::Del => Ok(Operation::Del {
            key: require_key(key)?,
        }),
        OpType::Move | OpType::Copy => {
            let key = require_key(key)?;
            let from = value.and_then(Key::from_value).ok_or_else(|| {
                Error::invalid_ops(format!("{} requires a source key in value", op_type))
            })?;
            Ok(if op_type == OpType::Move {
                Operation::Move { key, from }
            } else {
                Operation::Copy { key, from }
            })
        }
        OpType::Clear => Ok(Operation::Clear),
    }
}

/// Render an operation list as a raw record list, the inverse of
/// [`canonicalize_value`].
pub fn to_raw(ops: &[Operation]) -> Value {
    Value::Array(ops.iter().map(Operation::to_value).collect())
}
