//! Test utilities for the batch comprehensive tests

#![allow(dead_code)]

use txbatch::{
    IndexSchema, JournalEntry, Key, MemoryDatabase, RequestKind, StoreSchema, Value,
};

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// A database with:
/// - `kv`: out-of-line keys
/// - `users`: out-of-line keys, unique index `by_email` on `email`
/// - `accounts`: key path `id`, unique compound index `by_login` on
///   `[realm, login]`
/// - `log`: key path `seq`, auto-increment
pub fn test_db(native_unique: bool) -> MemoryDatabase {
    MemoryDatabase::builder()
        .store(StoreSchema::new("kv"))
        .store(StoreSchema::new("users").index(IndexSchema::new("by_email", "email").unique()))
        .store(
            StoreSchema::new("accounts")
                .key_path("id")
                .index(IndexSchema::new("by_login", txbatch::KeyPath::compound(["realm", "login"])).unique()),
        )
        .store(StoreSchema::new("log").key_path("seq").auto_increment())
        .native_unique(native_unique)
        .build()
}

/// Request kinds submitted so far, per store, in order.
pub fn requests(db: &MemoryDatabase) -> Vec<(RequestKind, String)> {
    db.journal()
        .iter()
        .filter_map(|e| e.submitted().map(|(k, s)| (k, s.to_string())))
        .collect()
}

/// Index of the first delivery in the journal, if any.
pub fn first_delivery(db: &MemoryDatabase) -> Option<usize> {
    db.journal().iter().position(JournalEntry::is_delivery)
}

pub fn record(db: &MemoryDatabase, store: &str, key: impl Into<Key>) -> Option<Value> {
    db.get(store, &key.into()).unwrap()
}
