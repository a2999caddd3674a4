//! Tier 2: Deferred writes
//!
//! Intent transitions, update merging and flush outcomes as seen through
//! the backend.

use crate::test_utils::*;
use docbridge::{BackendConfig, BridgeError, Pk, Record, SetFields, StoreCall, SuppressedIntent};
use serde_json::json;

fn saved_movie(db: &mut docbridge::Backend<docbridge::MemoryStore>, pk: &str) -> Record {
    let mut movie = Record::with_pk("Movie", pk).attr("title", "x").attr("year", 1979i64);
    db.save(&mut movie).unwrap();
    movie
}

#[test]
fn test_intent_states() {
    let mut db = backend(BackendConfig::default());
    let mut movie = saved_movie(&mut db, "m1");
    let pk = Pk::new("m1");

    db.begin().unwrap();
    db.save(&mut movie).unwrap();
    assert_eq!(db.buffer().state_of("movies", &pk).unwrap().kind(), "save");

    db.update(&mut movie, SetFields::values([("year", 1980i64)]), &[], true)
        .unwrap();
    assert_eq!(
        db.buffer().state_of("movies", &pk).unwrap().kind(),
        "save_then_update"
    );

    db.delete(&movie).unwrap();
    assert_eq!(db.buffer().state_of("movies", &pk).unwrap().kind(), "delete");
    assert_eq!(db.buffer().pending_deletes("movies"), vec![&pk]);
    assert!(db.buffer().pending_saves("movies").is_empty());

    let report = db.commit().unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(report.suppressed.len(), 1);
    assert!(matches!(report.suppressed[0], SuppressedIntent::Update { .. }));
    assert_eq!(db.store().count("movies"), 0);
}

#[test]
fn test_update_after_delete_is_rejected_without_side_effects() {
    let mut db = backend(BackendConfig::default());
    let mut movie = saved_movie(&mut db, "m1");

    db.begin().unwrap();
    db.delete(&movie).unwrap();
    let before = db.buffer().pending_operations();
    let err = db
        .update(&mut movie, SetFields::values([("year", 2000i64)]), &[], true)
        .unwrap_err();
    assert!(err.is_does_not_exist());
    assert_eq!(db.buffer().pending_operations(), before);
    assert_eq!(movie.get("year"), Some(&docbridge::Value::Int(1979)));
}

#[test]
fn test_set_and_unset_same_field_in_one_call() {
    let mut db = backend(BackendConfig::default());
    let mut movie = saved_movie(&mut db, "m1");

    db.begin().unwrap();
    db.update(
        &mut movie,
        SetFields::values([("year", 1990i64)]),
        &["year".to_string()],
        false,
    )
    .unwrap();
    let pending = db.buffer().pending_update("movies", &Pk::new("m1")).unwrap();
    assert!(pending.set().is_empty());
    assert!(pending.unset().contains("year"));

    db.commit().unwrap();
    let raw = db.store().raw("movies", &Pk::new("m1")).unwrap();
    assert!(raw.get("year").is_none());
}

#[test]
fn test_update_names_read_dotted_paths() {
    let mut db = backend(BackendConfig::default());
    let mut movie = saved_movie(&mut db, "m1");
    movie.set_path("rating.imdb", docbridge::Value::Float(8.4));

    db.begin().unwrap();
    db.update(&mut movie, SetFields::names(["rating.imdb", "missing"]), &[], false)
        .unwrap();
    let pending = db.buffer().pending_update("movies", &Pk::new("m1")).unwrap();
    assert_eq!(pending.set().len(), 1);
    assert_eq!(pending.set_value("rating.imdb"), Some(&json!(8.4)));
    db.commit().unwrap();

    let raw = db.store().raw("movies", &Pk::new("m1")).unwrap();
    assert_eq!(raw["rating"]["imdb"], json!(8.4));
}

#[test]
fn test_update_of_missing_document_reported_at_flush() {
    let mut db = backend(BackendConfig::default());
    db.begin().unwrap();
    let mut ghost = Record::with_pk("Movie", "ghost");
    db.update(&mut ghost, SetFields::values([("title", "x")]), &[], false)
        .unwrap();

    let report = db.commit().unwrap();
    assert_eq!(report.updated, 0);
    assert_eq!(report.entry_failures.len(), 1);
    assert!(report.entry_failures[0].error.is_does_not_exist());
    assert!(db.buffer().is_empty());
}

#[test]
fn test_flush_order_deletes_then_saves_then_updates() {
    let mut db = backend(BackendConfig::default());
    let mut a = saved_movie(&mut db, "a");
    let b = saved_movie(&mut db, "b");
    db.store().clear_calls();

    db.begin().unwrap();
    db.update(&mut a, SetFields::values([("year", 2001i64)]), &[], false)
        .unwrap();
    db.save(&mut Record::with_pk("Movie", "c")).unwrap();
    db.delete(&b).unwrap();
    db.commit().unwrap();

    let kinds: Vec<&str> = db
        .store()
        .calls()
        .iter()
        .map(|c| match c {
            StoreCall::BulkWrite { deletes, .. } if *deletes > 0 => "delete",
            StoreCall::BulkWrite { .. } => "save",
            StoreCall::UpdateOne { .. } => "update",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["delete", "save", "update"]);
}

#[test]
fn test_delete_without_pk_rejected_in_both_modes() {
    let mut db = backend(BackendConfig::default());
    let err = db.delete(&Record::new("Movie")).unwrap_err();
    assert!(matches!(err, BridgeError::InvalidIdentity { .. }));

    db.begin().unwrap();
    let err = db.delete(&Record::new("Movie")).unwrap_err();
    assert!(matches!(err, BridgeError::InvalidIdentity { .. }));
    assert!(db.buffer().is_empty());
}

#[test]
fn test_rollback_then_new_transaction() {
    let mut db = backend(BackendConfig::default());
    db.begin().unwrap();
    db.save(&mut Record::new("Movie")).unwrap();
    db.rollback().unwrap();

    db.begin().unwrap();
    db.save(&mut Record::new("Actor")).unwrap();
    let report = db.commit().unwrap();
    assert_eq!(report.flushed, vec!["actors".to_string()]);
    assert_eq!(db.store().count("movies"), 0);
}
