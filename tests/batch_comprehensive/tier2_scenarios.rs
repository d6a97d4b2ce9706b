//! Tier 2: Worked scenarios

use crate::test_utils::{init_tracing, record, requests, test_db};
use serde_json::json;
use txbatch::{
    batch, transactional_batch, BatchOptions, Error, Groups, Key, MemoryTransaction, Operation,
    RequestKind, StoreGroup, Target, Value,
};

#[test]
fn test_users_add_then_put() {
    init_tracing();
    let db = test_db(true);
    let results = transactional_batch(
        Target::database(&db),
        vec![StoreGroup::new().store(
            "users",
            json!([
                {"type": "add", "key": "u1", "val": {"name": "Ann"}},
                {"type": "put", "key": "u1", "val": {"name": "Ann2"}}
            ]),
        )],
        &BatchOptions::default(),
    )
    .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].store("users").unwrap(),
        &[Some(Value::from("u1")), Some(Value::from("u1"))]
    );
    assert_eq!(
        record(&db, "users", "u1"),
        Some(Value::from(json!({"name": "Ann2"})))
    );
}

#[test]
fn test_single_store_clear() {
    let db = test_db(true);
    db.load("kv", [(Key::from("a"), Value::Int(1)), (Key::from("b"), Value::Int(2))])
        .unwrap();

    let results = batch(Target::database(&db), "kv", "clear", &BatchOptions::default()).unwrap();

    assert_eq!(results, vec![None]);
    assert_eq!(requests(&db), vec![(RequestKind::Clear, "kv".to_string())]);
    assert!(db.records("kv").unwrap().is_empty());
}

#[test]
fn test_move_and_copy_decomposition() {
    let db = test_db(true);
    db.load("kv", [(Key::from("a"), Value::from("A")), (Key::from("b"), Value::from("B"))])
        .unwrap();

    let results = batch(
        Target::database(&db),
        "kv",
        json!([
            {"type": "move", "key": "a2", "value": "a"},
            {"type": "copy", "key": "b2", "value": "b"}
        ]),
        &BatchOptions::default(),
    )
    .unwrap();

    assert_eq!(results, vec![Some(Value::from("a2")), Some(Value::from("b2"))]);
    let kinds: Vec<RequestKind> = requests(&db).into_iter().map(|(k, _)| k).collect();
    assert_eq!(
        kinds,
        vec![
            RequestKind::Get,
            RequestKind::Put,
            RequestKind::Delete,
            RequestKind::Get,
            RequestKind::Put,
        ]
    );
    assert_eq!(record(&db, "kv", "a"), None);
    assert_eq!(record(&db, "kv", "a2"), Some(Value::from("A")));
    assert_eq!(record(&db, "kv", "b"), Some(Value::from("B")));
    assert_eq!(record(&db, "kv", "b2"), Some(Value::from("B")));
}

#[test]
fn test_unique_conflict_and_owner_rewrite() {
    let db = test_db(false);
    db.load("users", [(Key::from("k2"), Value::from(json!({"email": "x"})))])
        .unwrap();
    let opts = BatchOptions::default().emulate_unique_indexes();

    let err = batch(
        Target::database(&db),
        "users",
        vec![Operation::put("k1", json!({"email": "x"}))],
        &opts,
    )
    .unwrap_err();
    assert!(matches!(err, Error::ConstraintViolation { conflicts: 1, .. }));
    assert!(requests(&db)
        .iter()
        .all(|(kind, _)| *kind == RequestKind::IndexGetKey));

    db.clear_journal();
    let results = batch(
        Target::database(&db),
        "users",
        vec![Operation::put("k2", json!({"email": "x", "name": "owner"}))],
        &opts,
    )
    .unwrap();
    assert_eq!(results, vec![Some(Value::from("k2"))]);
}

#[test]
fn test_compound_unique_index() {
    let db = test_db(false);
    let opts = BatchOptions::default().emulate_unique_indexes();
    batch(
        Target::database(&db),
        "accounts",
        vec![Operation::put("a1", json!({"realm": "eu", "login": "ann"}))],
        &opts,
    )
    .unwrap();

    // same pair under a different key
    let err = batch(
        Target::database(&db),
        "accounts",
        vec![Operation::put("a2", json!({"realm": "eu", "login": "ann"}))],
        &opts,
    )
    .unwrap_err();
    assert!(matches!(err, Error::ConstraintViolation { .. }));

    // different pair
    batch(
        Target::database(&db),
        "accounts",
        vec![Operation::put("a2", json!({"realm": "us", "login": "ann"}))],
        &opts,
    )
    .unwrap();
    assert_eq!(
        record(&db, "accounts", "a2"),
        Some(Value::from(json!({"id": "a2", "realm": "us", "login": "ann"})))
    );
}

#[test]
fn test_auto_increment_keys_flow_into_results() {
    let db = test_db(true);
    let results = batch(
        Target::database(&db),
        "log",
        vec![
            Operation::add_value(json!({"msg": "one"})),
            Operation::add_value(json!({"msg": "two"})),
        ],
        &BatchOptions::default(),
    )
    .unwrap();
    assert_eq!(results, vec![Some(Value::Int(1)), Some(Value::Int(2))]);
    assert_eq!(
        record(&db, "log", 2),
        Some(Value::from(json!({"seq": 2, "msg": "two"})))
    );
}

#[test]
fn test_groups_from_dynamic_value() {
    let db = test_db(true);
    let groups: Groups<MemoryTransaction> = Groups::from_value(&Value::from(json!([
        {"kv": {"a": 1}},
        {"kv": [{"type": "move", "key": "b", "value": "a"}], "users": "clear"}
    ])))
    .unwrap();
    assert_eq!(txbatch::store_names(&groups), vec!["kv", "users"]);

    let results = transactional_batch(Target::database(&db), groups, &BatchOptions::default())
        .unwrap();
    assert_eq!(results[1].store("kv").unwrap(), &[Some(Value::from("b"))]);
    assert_eq!(results[1].store("users").unwrap(), &[None]);
    assert_eq!(record(&db, "kv", "b"), Some(Value::Int(1)));
}
