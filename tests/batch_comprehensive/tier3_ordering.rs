//! Tier 3: Dispatch ordering
//!
//! Serial batches issue one request at a time in group, store and op
//! order. Parallel batches issue everything before the first outcome.

use crate::test_utils::{first_delivery, requests, test_db};
use txbatch::{
    transactional_batch, AdapterOutcome, BatchOptions, JournalEntry, Key, MemoryTransaction,
    Operation, RequestKind, StoreGroup, Target, Transaction, Value,
};

type Group = StoreGroup<MemoryTransaction>;

fn groups() -> Vec<Group> {
    vec![
        Group::new()
            .store("kv", vec![Operation::put("a", 1), Operation::put("b", 2)])
            .store("users", vec![Operation::put("u1", Value::Null)]),
        Group::new().store("kv", vec![Operation::del("a")]),
    ]
}

#[test]
fn test_serial_total_order() {
    let db = test_db(true);
    transactional_batch(Target::database(&db), groups(), &BatchOptions::default()).unwrap();

    assert_eq!(
        requests(&db),
        vec![
            (RequestKind::Put, "kv".to_string()),
            (RequestKind::Put, "kv".to_string()),
            (RequestKind::Put, "users".to_string()),
            (RequestKind::Delete, "kv".to_string()),
        ]
    );
    // each submission waits for the previous outcome
    let journal = db.journal();
    for pair in journal.windows(2) {
        if pair[0].submitted().is_some() {
            assert!(pair[1].is_delivery());
        }
    }
}

#[test]
fn test_parallel_dispatches_before_first_outcome() {
    let db = test_db(true);
    let results = transactional_batch(
        Target::database(&db),
        groups(),
        &BatchOptions::default().parallel(),
    )
    .unwrap();

    let delivered_at = first_delivery(&db).unwrap();
    let submitted_before = db.journal()[..delivered_at]
        .iter()
        .filter(|e| e.submitted().is_some())
        .count();
    assert_eq!(submitted_before, 4);
    assert_eq!(
        results[0].store("kv").unwrap(),
        &[Some(Value::from("a")), Some(Value::from("b"))]
    );
    assert_eq!(results[1].store("kv").unwrap(), &[None]);
}

#[test]
fn test_parallel_move_keeps_its_own_chain_ordered() {
    let db = test_db(true);
    db.load("kv", [(Key::from("src"), Value::Int(9))]).unwrap();
    transactional_batch(
        Target::database(&db),
        Group::new()
            .store("kv", vec![Operation::move_record("src", "dst")])
            .store("users", vec![Operation::put("u1", Value::Null)]),
        &BatchOptions::default().parallel(),
    )
    .unwrap();

    let kinds: Vec<RequestKind> = requests(&db).into_iter().map(|(k, _)| k).collect();
    // the read and the user put go out together; the move tail follows the read
    assert_eq!(kinds[..2], [RequestKind::Get, RequestKind::Put]);
    assert_eq!(kinds[2..], [RequestKind::Put, RequestKind::Delete]);
    assert_eq!(db.get("kv", &Key::from("dst")).unwrap(), Some(Value::Int(9)));
}

#[test]
fn test_pending_adapter_blocks_serial_successors() {
    let db = test_db(true);
    transactional_batch(
        Target::database(&db),
        vec![
            Group::adapter(|txn: &mut MemoryTransaction| {
                let request = txn.put("kv", Value::from("first"), Some(Key::from("x")))?;
                Ok(AdapterOutcome::Pending(request))
            }),
            Group::new().store("kv", vec![Operation::del("x")]),
        ],
        &BatchOptions::default(),
    )
    .unwrap();

    let journal = db.journal();
    let delete_at = journal
        .iter()
        .position(|e| e.submitted() == Some((RequestKind::Delete, "kv")))
        .unwrap();
    assert!(journal[..delete_at].iter().any(JournalEntry::is_delivery));
    assert_eq!(db.get("kv", &Key::from("x")).unwrap(), None);
}
