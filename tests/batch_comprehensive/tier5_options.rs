//! Tier 5: Options files

use crate::test_utils::{first_delivery, test_db};
use txbatch::{
    transactional_batch, BatchOptions, ErrorKind, MemoryTransaction, Operation, StoreGroup,
    Target, CONFIG_FILE_NAME,
};

#[test]
fn test_default_file_parses_to_defaults() {
    let parsed = BatchOptions::from_toml_str(BatchOptions::default_toml()).unwrap();
    assert_eq!(parsed, BatchOptions::default());
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let parsed = BatchOptions::from_toml_str("parallel = true\nextra_stores = [\"log\"]").unwrap();
    assert_eq!(parsed, BatchOptions::default().parallel().extra_store("log"));
}

#[test]
fn test_wrong_field_type_is_an_argument_error() {
    let err = BatchOptions::from_toml_str("resolve_early = \"yes\"").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
}

#[test]
fn test_options_file_drives_a_parallel_batch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    BatchOptions::default()
        .parallel()
        .emulate_unique_indexes()
        .write_to_file(&path)
        .unwrap();

    let options = BatchOptions::from_file(&path).unwrap();
    assert!(options.parallel);
    assert!(options.emulate_unique_indexes);

    let db = test_db(true);
    transactional_batch(
        Target::database(&db),
        StoreGroup::<MemoryTransaction>::new()
            .store("kv", vec![Operation::put("a", 1)])
            .store("log", vec![Operation::add_value(serde_json::json!({"m": 1}))]),
        &options,
    )
    .unwrap();

    let delivered_at = first_delivery(&db).unwrap();
    assert_eq!(
        db.journal()[..delivered_at]
            .iter()
            .filter(|e| e.submitted().is_some())
            .count(),
        2
    );
}

#[test]
fn test_missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = BatchOptions::from_file(&dir.path().join(CONFIG_FILE_NAME)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Engine);
    assert!(err.to_string().contains(CONFIG_FILE_NAME));
}
