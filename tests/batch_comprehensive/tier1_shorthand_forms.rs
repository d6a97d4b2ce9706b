//! Tier 1: Shorthand forms
//!
//! Every caller-facing form of an operation group runs the same batch as
//! its canonical list.

use crate::test_utils::{record, requests, test_db};
use proptest::prelude::*;
use serde_json::json;
use txbatch::{batch, BatchOptions, Key, Operation, Ops, Value};

fn run(ops: impl Into<Ops>) -> (Vec<Option<Value>>, Vec<(Key, Value)>) {
    let db = test_db(true);
    db.load("kv", [(Key::from("old"), Value::Int(0))]).unwrap();
    let results = batch(
        txbatch::Target::database(&db),
        "kv",
        ops,
        &BatchOptions::default(),
    )
    .unwrap();
    (results, db.records("kv").unwrap())
}

#[test]
fn test_mapping_form_equals_record_list() {
    let mapping = run(json!({"a": 1, "b": "two", "old": null}));
    let list = run(json!([
        {"type": "put", "key": "a", "value": 1},
        {"type": "put", "key": "b", "value": "two"},
        {"type": "del", "key": "old"}
    ]));
    let canonical = run(vec![
        Operation::put("a", 1),
        Operation::put("b", "two"),
        Operation::del("old"),
    ]);
    assert_eq!(mapping, list);
    assert_eq!(list, canonical);
}

#[test]
fn test_wrapper_forms_equal_record_list() {
    let wrapped = run(json!([
        {"put": {"a": 1, "b": "two"}},
        {"del": {"key": "old"}}
    ]));
    let wrapped_list = run(json!([
        {"put": [{"key": "a", "val": 1}, {"key": "b", "value": "two"}]},
        {"del": [{"key": "old"}]}
    ]));
    let list = run(json!([
        {"type": "put", "key": "a", "value": 1},
        {"type": "put", "key": "b", "value": "two"},
        {"type": "del", "key": "old"}
    ]));
    assert_eq!(wrapped, list);
    assert_eq!(wrapped_list, list);
}

#[test]
fn test_clear_token_equals_clear_record() {
    assert_eq!(run("clear"), run(json!([{"type": "clear"}])));
    assert_eq!(run(Ops::clear()), run(vec![Operation::Clear]));
}

#[test]
fn test_empty_forms_issue_nothing() {
    let db = test_db(true);
    let target = txbatch::Target::database(&db);
    assert!(batch(target, "kv", json!([]), &BatchOptions::default())
        .unwrap()
        .is_empty());
    let target = txbatch::Target::database(&db);
    assert!(batch(target, "kv", json!({}), &BatchOptions::default())
        .unwrap()
        .is_empty());
    assert!(requests(&db).is_empty());
}

#[test]
fn test_nested_type_mismatch_is_rejected() {
    let db = test_db(true);
    let err = batch(
        txbatch::Target::database(&db),
        "kv",
        json!([{"put": [{"type": "del", "key": "a"}]}]),
        &BatchOptions::default(),
    )
    .unwrap_err();
    assert!(err.is_type_error());
    assert_eq!(record(&db, "kv", "a"), None);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_mapping_and_list_forms_agree(entries in prop::collection::btree_map("[a-z]{1,4}", prop::option::of(any::<i64>()), 0..8)) {
        let mapping: serde_json::Map<String, serde_json::Value> = entries
            .iter()
            .map(|(k, v)| (k.clone(), v.map(serde_json::Value::from).unwrap_or(serde_json::Value::Null)))
            .collect();
        let list: Vec<Operation> = entries
            .iter()
            .map(|(k, v)| match v {
                Some(n) => Operation::put(k.as_str(), *n),
                None => Operation::del(k.as_str()),
            })
            .collect();

        let by_mapping = run(serde_json::Value::Object(mapping));
        let by_list = run(list);
        prop_assert_eq!(by_mapping, by_list);
    }
}
