//! Tier 4: Failures
//!
//! Validation fails before anything is issued; the first runtime failure
//! settles the batch and later outcomes change nothing.

use crate::test_utils::{record, requests, test_db};
use serde_json::json;
use txbatch::{
    batch, transactional_batch, AdapterOutcome, BatchOptions, EngineErrorKind, Error, ErrorKind,
    Key, MemoryTransaction, Operation, RequestKind, StoreGroup, Target, Transaction, Value,
};

#[test]
fn test_unknown_type_issues_nothing() {
    let db = test_db(true);
    let err = batch(
        Target::database(&db),
        "kv",
        json!([
            {"type": "put", "key": "a", "value": 1},
            {"type": "frob", "key": "b"}
        ]),
        &BatchOptions::default(),
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("frob"));
    assert!(db.journal().is_empty());
}

#[test]
fn test_invalid_later_group_fails_before_its_requests() {
    let db = test_db(true);
    let err = transactional_batch(
        Target::database(&db),
        vec![
            StoreGroup::<MemoryTransaction>::new().store("kv", vec![Operation::put("a", 1)]),
            StoreGroup::new().store("users", json!([{"type": "del"}])),
        ],
        &BatchOptions::default(),
    )
    .unwrap_err();

    assert!(err.is_type_error());
    // the first group already ran; nothing was issued for the second
    assert_eq!(requests(&db), vec![(RequestKind::Put, "kv".to_string())]);
    assert_eq!(record(&db, "kv", "a"), Some(Value::Int(1)));
}

#[test]
fn test_first_failure_wins_in_parallel() {
    let db = test_db(true);
    db.load("kv", [(Key::from("a"), Value::Int(0))]).unwrap();
    db.load("users", [(Key::from("u"), Value::Int(0))]).unwrap();

    let err = transactional_batch(
        Target::database(&db),
        StoreGroup::<MemoryTransaction>::new()
            .store("kv", vec![Operation::add("a", 1)])
            .store("users", vec![Operation::add("u", 1)]),
        &BatchOptions::default().parallel(),
    )
    .unwrap_err();

    match err {
        Error::Engine(e) => {
            assert_eq!(e.kind, EngineErrorKind::Constraint);
            assert!(e.to_string().contains("'kv'"));
        }
        other => panic!("expected engine error, got {other:?}"),
    }
}

#[test]
fn test_serial_failure_stops_later_ops() {
    let db = test_db(true);
    db.load("kv", [(Key::from("a"), Value::Int(0))]).unwrap();

    let err = batch(
        Target::database(&db),
        "kv",
        vec![
            Operation::put("b", 1),
            Operation::add("a", 1),
            Operation::put("c", 1),
        ],
        &BatchOptions::default(),
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Engine);
    assert_eq!(requests(&db).len(), 2);
    // handled failure: the transaction still commits what came before
    assert_eq!(record(&db, "kv", "b"), Some(Value::Int(1)));
    assert_eq!(record(&db, "kv", "c"), None);
}

#[test]
fn test_abort_rolls_back_everything() {
    let db = test_db(true);
    let err = transactional_batch(
        Target::database(&db),
        vec![
            StoreGroup::new().store("kv", vec![Operation::put("a", 1)]),
            StoreGroup::adapter(|txn: &mut MemoryTransaction| {
                txn.abort();
                Ok(AdapterOutcome::Ready(None))
            }),
        ],
        &BatchOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, Error::Aborted { .. }));
    assert_eq!(record(&db, "kv", "a"), None);
}

#[test]
fn test_missing_move_source() {
    let db = test_db(true);
    let err = batch(
        Target::database(&db),
        "kv",
        vec![Operation::move_record("ghost", "b")],
        &BatchOptions::default(),
    )
    .unwrap_err();

    assert_eq!(
        err,
        Error::MissingSource {
            store: "kv".into(),
            key: Key::from("ghost")
        }
    );
    assert_eq!(err.kind(), ErrorKind::Constraint);
    assert_eq!(record(&db, "kv", "b"), None);
}

#[test]
fn test_empty_store_name() {
    let db = test_db(true);
    let err = batch(Target::database(&db), "", "clear", &BatchOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
    assert!(db.journal().is_empty());
}

#[test]
fn test_missing_in_line_key_surfaces_as_engine_data_error() {
    let db = test_db(true);
    // no id and no auto-increment
    let err = batch(
        Target::database(&db),
        "accounts",
        vec![Operation::put_value(json!({"realm": "eu", "login": "ann"}))],
        &BatchOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Engine(ref e) if e.kind == EngineErrorKind::Data));
}
