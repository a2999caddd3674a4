//! Tier 5: Reference loading, cache and hooks

use crate::test_utils::*;
use docbridge::{
    BackendConfig, BackendHook, BridgeError, BridgeResult, Record, Reference, SetFields, StoreCall,
    Value, ValueMap,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_broken_reference_does_not_block_siblings() {
    let mut db = backend(BackendConfig::default());
    let mut scott = Record::with_pk("Director", "scott").attr("name", "Ridley");
    db.save(&mut scott).unwrap();
    let mut movie = Record::new("Movie")
        .attr("director", scott.clone())
        .attr("producer", Reference::new("directors", "deleted"))
        .attr("title", "Alien");
    let pk = db.save(&mut movie).unwrap();

    let mut loaded = db.get_by_pk("Movie", &pk).unwrap();
    let errors = db.resolve_references(&mut loaded);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, "producer");
    assert!(errors[0].1.is_does_not_exist());
    assert!(matches!(loaded.get("producer"), Some(Value::Reference(_))));
    assert_eq!(
        loaded
            .get("director")
            .and_then(Value::as_record)
            .and_then(|r| r.get("name")),
        Some(&Value::from("Ridley"))
    );
}

#[test]
fn test_load_field_resolves_lazily() {
    let mut db = backend(BackendConfig::default());
    let mut scott = Record::with_pk("Director", "scott").attr("name", "Ridley");
    db.save(&mut scott).unwrap();
    let mut movie = Record::new("Movie").attr("director", scott.clone());
    let pk = db.save(&mut movie).unwrap();

    let loaded = db.get_by_pk("Movie", &pk).unwrap();
    let director = db.load_field(&loaded, "director").unwrap();
    assert_eq!(director.as_record().map(Record::pk), Some(scott.pk()));

    db.delete(&scott).unwrap();
    let err = db.load_field(&loaded, "director").unwrap_err();
    match err {
        BridgeError::DoesNotExist { collection, pk, .. } => {
            assert_eq!(collection, "directors");
            assert_eq!(pk.as_deref(), Some("scott"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_cache_evicts_oldest() {
    let mut db = backend(BackendConfig::new().caching(2));
    let refs: Vec<Reference> = (0..3)
        .map(|i| {
            let pk = db.save(&mut Record::new("Actor").attr("n", i)).unwrap();
            Reference::new("actors", pk)
        })
        .collect();

    for r in &refs {
        db.resolve(r).unwrap();
    }
    assert_eq!(db.cached_records(), 2);

    db.store().clear_calls();
    db.resolve(&refs[2]).unwrap();
    assert!(db.store().calls().is_empty());
    db.resolve(&refs[0]).unwrap();
    assert_eq!(count_calls(&db, |c| matches!(c, StoreCall::Find { .. })), 1);
}

#[test]
fn test_staged_write_invalidates_cache() {
    let mut db = backend(BackendConfig::new().caching(10));
    let mut actor = Record::new("Actor").attr("name", "A");
    let pk = db.save(&mut actor).unwrap();
    db.resolve(&Reference::new("actors", pk.clone())).unwrap();
    assert_eq!(db.cached_records(), 1);

    db.begin().unwrap();
    db.update(&mut actor, SetFields::values([("name", "B")]), &[], true)
        .unwrap();
    assert_eq!(db.cached_records(), 0);
    db.commit().unwrap();

    let fresh = db.resolve(&Reference::new("actors", pk)).unwrap();
    assert_eq!(fresh.get("name"), Some(&Value::from("B")));
}

struct Audit {
    saves: Arc<AtomicUsize>,
    updates: Arc<AtomicUsize>,
}

impl BackendHook for Audit {
    fn before_save(&self, record: &mut Record) -> BridgeResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if record.get("created_by").is_none() {
            record.set("created_by", "audit");
        }
        Ok(())
    }

    fn before_update(&self, _record: &Record, set: &ValueMap, _unset: &[String]) -> BridgeResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if set.contains_key("created_by") {
            return Err(BridgeError::invalid_input("created_by is immutable"));
        }
        Ok(())
    }
}

struct RejectAll;

impl BackendHook for RejectAll {
    fn before_save(&self, _record: &mut Record) -> BridgeResult<()> {
        Err(BridgeError::invalid_input("read only"))
    }
}

#[test]
fn test_hooks_run_in_order_and_can_abort() {
    let saves = Arc::new(AtomicUsize::new(0));
    let updates = Arc::new(AtomicUsize::new(0));
    let mut db = backend(BackendConfig::default());
    db.add_hook(Box::new(Audit {
        saves: Arc::clone(&saves),
        updates: Arc::clone(&updates),
    }));

    let mut records = vec![Record::new("Movie"), Record::new("Movie")];
    db.save_multiple(&mut records).unwrap();
    assert_eq!(saves.load(Ordering::SeqCst), 2);
    assert!(records
        .iter()
        .all(|r| r.get("created_by") == Some(&Value::from("audit"))));

    let err = db
        .update(
            &mut records[0],
            SetFields::values([("created_by", "me")]),
            &[],
            true,
        )
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidInput { .. }));
    assert_eq!(updates.load(Ordering::SeqCst), 1);
    assert_eq!(records[0].get("created_by"), Some(&Value::from("audit")));

    db.add_hook(Box::new(RejectAll));
    db.store().clear_calls();
    assert!(db.save(&mut Record::new("Movie")).is_err());
    assert!(db.store().calls().is_empty());
    // first hook still ran
    assert_eq!(saves.load(Ordering::SeqCst), 3);
}
