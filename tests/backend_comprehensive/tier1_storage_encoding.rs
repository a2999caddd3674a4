//! Tier 1: Storage encoding
//!
//! What a saved record looks like in the store, and what comes back.

use crate::test_utils::*;
use docbridge::{BackendConfig, Expr, Record, Reference, Value, ValueMap};
use serde_json::json;

#[test]
fn test_marker_mode_reference_object() {
    let mut db = backend(BackendConfig::default());
    let mut ridley = Record::with_pk("Director", "d1").attr("name", "Ridley Scott");
    db.save(&mut ridley).unwrap();
    let mut alien = Record::new("Movie").attr("director", ridley.clone());
    let pk = db.save(&mut alien).unwrap();

    let raw = db.store().raw("movies", &pk).unwrap();
    assert_eq!(
        raw["director"],
        json!({
            "_type": "object_reference",
            "collection": "directors",
            "pk": "d1",
            "__ref__": "directors:d1"
        })
    );
}

#[test]
fn test_pk_mode_reference_object_has_no_marker() {
    let mut db = backend(BackendConfig::new().use_pk_based_refs(true));
    let mut alien = Record::new("Movie").attr("director", Reference::new("directors", "d1"));
    let pk = db.save(&mut alien).unwrap();

    let raw = db.store().raw("movies", &pk).unwrap();
    assert_eq!(
        raw["director"],
        json!({"_type": "object_reference", "collection": "directors", "pk": "d1"})
    );
}

#[test]
fn test_embedding_unsaved_record_fails() {
    let mut db = backend(BackendConfig::default());
    let mut alien = Record::new("Movie").attr("director", Record::new("Director"));
    let err = db.save(&mut alien).unwrap_err();
    assert!(matches!(err, docbridge::BridgeError::InvalidIdentity { .. }));
    assert_eq!(db.store().count("movies"), 0);
}

#[test]
fn test_loaded_references_stay_lazy() {
    let mut db = backend(BackendConfig::default());
    let mut alien = Record::new("Movie").attr("director", Reference::new("directors", "d1"));
    let pk = db.save(&mut alien).unwrap();

    let loaded = db.get_by_pk("Movie", &pk).unwrap();
    assert_eq!(
        loaded.get("director"),
        Some(&Value::Reference(Reference::new("directors", "d1")))
    );
    assert_eq!(loaded.doc_type(), "Movie");
    assert_eq!(loaded.pk(), Some(&pk));
}

#[test]
fn test_nested_dotted_keys_escaped() {
    let mut db = backend(BackendConfig::default());
    let mut inner = ValueMap::new();
    inner.insert("v1.2".to_string(), Value::Bool(true));
    let mut outer = ValueMap::new();
    outer.insert("a.b".to_string(), Value::Map(inner));
    let mut movie = Record::new("Movie").attr("meta", outer.clone());
    let pk = db.save(&mut movie).unwrap();

    let raw = db.store().raw("movies", &pk).unwrap();
    assert_eq!(
        raw["meta"],
        json!({"a:a5b8afc131:b": {"v1:a5b8afc131:2": true}})
    );
    let loaded = db.get_by_pk("movies", &pk).unwrap();
    assert_eq!(loaded.get("meta"), Some(&Value::Map(outer)));
}

#[test]
fn test_projection_keeps_pk_only_plus_fields() {
    let mut db = backend(BackendConfig::default());
    let mut movie = Record::new("Movie")
        .attr("title", "Alien")
        .attr("year", 1979i64)
        .attr("runtime", 117i64);
    db.save(&mut movie).unwrap();

    let only = vec!["title".to_string(), "year".to_string()];
    let results = db.filter("Movie", &Expr::all(), Some(&only[..])).unwrap();
    assert_eq!(results.projection(), Some(&only[..]));
    let record = results.first().unwrap().unwrap();
    assert_eq!(record.pk(), movie.pk());
    assert_eq!(record.attributes().len(), 2);
    assert_eq!(db.load_field(&record, "runtime").unwrap(), Value::Int(117));
}
