//! Tier 4: Bulk writes and indexes

use crate::test_utils::*;
use docbridge::{
    BackendConfig, BatchExecutor, BridgeError, DocumentStore, IndexSpec, MemoryStore, Pk, Record,
    StoreCall,
};

fn movies(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| Record::new("Movie").attr("imdb_id", format!("tt{:07}", i)))
        .collect()
}

#[test]
fn test_2500_records_in_three_chunks() {
    let mut db = backend(BackendConfig::default());
    let mut records = movies(2500);
    let outcome = db.save_multiple(&mut records).unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.identities.len(), 2500);
    assert!(records.iter().all(|r| r.pk().is_some()));
    assert_eq!(db.store().count("movies"), 2500);

    let sizes: Vec<usize> = db
        .store()
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            StoreCall::BulkWrite { replaces, .. } => Some(replaces),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![1000, 1000, 500]);
}

#[test]
fn test_executor_save_records_assigns_pks() {
    let store = MemoryStore::new();
    let exec = BatchExecutor::new(3).unwrap();
    let mut records = movies(7);
    let outcome = exec
        .save_records(&store, "movies", &mut records, |r| {
            Ok(serde_json::json!({ "pk": r.pk().unwrap().as_str() })
                .as_object()
                .cloned()
                .unwrap_or_default())
        })
        .unwrap();
    assert_eq!(outcome.chunk_sizes, vec![3, 3, 1]);
    assert_eq!(store.count("movies"), 7);
    assert_eq!(
        outcome.identities,
        records.iter().map(|r| r.pk().unwrap().clone()).collect::<Vec<_>>()
    );
}

#[test]
fn test_zero_chunk_size_rejected() {
    assert!(matches!(
        BatchExecutor::new(0),
        Err(BridgeError::InvalidInput { .. })
    ));
    assert!(matches!(
        docbridge::Backend::new(
            std::sync::Arc::new(MemoryStore::new()),
            registry(),
            BackendConfig::new().batch_size(0)
        ),
        Err(BridgeError::Config { .. })
    ));
}

#[test]
fn test_unordered_bulk_continues_after_duplicate() {
    let mut db = backend(BackendConfig::new().batch_size(10));
    db.ensure_indexes(false).unwrap();
    let mut records = vec![
        Record::new("Movie").attr("imdb_id", "tt1"),
        Record::new("Movie").attr("imdb_id", "tt1"),
        Record::new("Movie").attr("imdb_id", "tt2"),
    ];
    let outcome = db.save_multiple(&mut records).unwrap();

    assert_eq!(outcome.failures.len(), 1);
    let (collection, failure) = &outcome.failures[0];
    assert_eq!(collection, "movies");
    assert!(failure.error.is_duplicate_key());
    assert_eq!(failure.pk.as_ref(), records[1].pk());
    assert_eq!(db.store().count("movies"), 2);
}

#[test]
fn test_bulk_delete_outage_surfaces() {
    let mut db = backend(BackendConfig::default());
    let mut records = movies(3);
    let outcome = db.save_multiple(&mut records).unwrap();

    db.store().set_unavailable("movies", true);
    let err = db
        .delete_by_primary_keys("Movie", &outcome.identities)
        .unwrap_err();
    assert!(err.is_storage());
    db.store().set_unavailable("movies", false);
    assert_eq!(db.store().count("movies"), 3);

    db.delete_by_primary_keys("movies", &outcome.identities)
        .unwrap();
    assert_eq!(db.store().count("movies"), 0);
}

#[test]
fn test_deferred_delete_by_pks() {
    let mut db = backend(BackendConfig::default());
    let mut records = movies(2);
    db.save_multiple(&mut records).unwrap();

    db.begin().unwrap();
    db.delete_by_primary_keys("Movie", &[Pk::new("never-saved")])
        .unwrap();
    db.delete(&records[0]).unwrap();
    assert_eq!(db.buffer().pending_operations().deletes, 2);
    db.commit().unwrap();
    assert_eq!(db.store().count("movies"), 1);
}

#[test]
fn test_ensure_indexes_creates_declared_and_pk() {
    let db = backend(BackendConfig::default());
    db.ensure_indexes(true).unwrap();

    let fields: Vec<Vec<String>> = db
        .store()
        .indexes("movies")
        .iter()
        .map(|s| s.field_names().iter().map(|f| f.to_string()).collect())
        .collect();
    assert_eq!(
        fields,
        vec![
            vec!["pk".to_string()],
            vec!["title".to_string()],
            vec!["imdb_id".to_string()],
        ]
    );
    assert_eq!(db.store().indexes("directors").len(), 1);
}

#[test]
fn test_create_index_on_conflicting_data_fails_after_retry() {
    let mut db = backend(BackendConfig::default());
    let mut records = vec![
        Record::new("Movie").attr("title", "Same"),
        Record::new("Movie").attr("title", "Same"),
    ];
    db.save_multiple(&mut records).unwrap();

    let err = db
        .create_index("Movie", &IndexSpec::new(["title"]).unique())
        .unwrap_err();
    assert!(matches!(err, BridgeError::IndexConflict { .. }));
    let creates = count_calls(&db, |c| matches!(c, StoreCall::CreateIndex { .. }));
    assert_eq!(creates, 2);
}

#[test]
fn test_drop_missing_index_errors() {
    let db = backend(BackendConfig::default());
    assert!(db.drop_index("Movie", &["title".to_string()]).is_err());
    db.create_indexes("Movie", &[IndexSpec::new(["title"]), IndexSpec::new(["year"])])
        .unwrap();
    db.drop_index("Movie", &["year".to_string()]).unwrap();
    assert_eq!(db.store().indexes("movies").len(), 1);
    // trait object usage
    let store: &dyn DocumentStore = &**db.store();
    assert!(store.drop_index("movies", &["year".to_string()]).is_err());
}
