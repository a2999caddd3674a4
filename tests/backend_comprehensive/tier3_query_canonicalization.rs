//! Tier 3: Query canonicalization
//!
//! Queries written against records must find the documents written with
//! embedded references, in either reference mode.

use crate::test_utils::*;
use docbridge::{
    Backend, BackendConfig, BridgeError, Expr, FieldAliasEncoder, MemoryStore, Record, Value,
};
use serde_json::json;

struct Fixture {
    db: Backend<MemoryStore>,
    scott: Record,
    cameron: Record,
    weaver: Record,
    holm: Record,
}

fn fixture(pk_refs: bool) -> Fixture {
    let mut db = backend(BackendConfig::new().use_pk_based_refs(pk_refs));
    let mut scott = Record::with_pk("Director", "scott");
    let mut cameron = Record::with_pk("Director", "cameron");
    let mut weaver = Record::with_pk("Actor", "weaver");
    let mut holm = Record::with_pk("Actor", "holm");
    for r in [&mut scott, &mut cameron, &mut weaver, &mut holm] {
        db.save(r).unwrap();
    }
    let mut movies = vec![
        Record::with_pk("Movie", "alien")
            .attr("title", "Alien")
            .attr("year", 1979i64)
            .attr("director", scott.clone())
            .attr("cast", vec![weaver.clone(), holm.clone()]),
        Record::with_pk("Movie", "aliens")
            .attr("title", "Aliens")
            .attr("year", 1986i64)
            .attr("director", cameron.clone())
            .attr("cast", vec![weaver.clone()]),
        Record::with_pk("Movie", "legend")
            .attr("title", "Legend")
            .attr("year", 1985i64)
            .attr("director", scott.clone()),
    ];
    db.save_multiple(&mut movies).unwrap();
    Fixture {
        db,
        scott,
        cameron,
        weaver,
        holm,
    }
}

fn titles(db: &Backend<MemoryStore>, query: &Expr) -> Vec<String> {
    db.filter("Movie", query, None)
        .unwrap()
        .records()
        .unwrap()
        .iter()
        .map(|r| r.get("title").and_then(Value::as_str).unwrap_or("").to_string())
        .collect()
}

#[test]
fn test_reference_queries_in_both_modes() {
    for pk_refs in [false, true] {
        let f = fixture(pk_refs);
        let db = &f.db;

        assert_eq!(titles(db, &Expr::eq("director", f.scott.clone())), vec!["Alien", "Legend"]);
        assert_eq!(titles(db, &Expr::ne("director", f.scott.clone())), vec!["Aliens"]);
        assert_eq!(
            titles(db, &Expr::is_in("director", vec![f.cameron.clone()])),
            vec!["Aliens"]
        );
        assert_eq!(
            titles(db, &Expr::is_in("cast", vec![f.holm.clone()])),
            vec!["Alien"]
        );
        assert_eq!(
            titles(db, &Expr::all_of("cast", vec![f.weaver.clone(), f.holm.clone()])),
            vec!["Alien"]
        );
        assert_eq!(
            titles(
                db,
                &Expr::and(vec![
                    Expr::eq("director", f.scott.clone()),
                    Expr::gt("year", 1980i64),
                ])
            ),
            vec!["Legend"]
        );
    }
}

#[test]
fn test_canonical_form_per_mode() {
    let marker = fixture(false);
    assert_eq!(
        marker.db.canonicalize(&Expr::eq("director", marker.scott.clone())).unwrap(),
        Expr::eq("director.__ref__", "directors:scott")
    );

    let pk = fixture(true);
    assert_eq!(
        pk.db.canonicalize(&Expr::eq("director", pk.scott.clone())).unwrap(),
        Expr::eq("director.pk", "scott")
    );
}

#[test]
fn test_nin_and_nor() {
    let f = fixture(false);
    assert_eq!(
        titles(&f.db, &Expr::not_in("director", vec![f.scott.clone()])),
        vec!["Aliens"]
    );
    assert_eq!(
        titles(
            &f.db,
            &Expr::nor(vec![Expr::eq("title", "Alien"), Expr::eq("title", "Aliens")])
        ),
        vec!["Legend"]
    );
}

#[test]
fn test_empty_membership_matches_nothing() {
    let f = fixture(false);
    assert!(titles(&f.db, &Expr::is_in("cast", Vec::<Value>::new())).is_empty());
    assert!(titles(&f.db, &Expr::all_of("cast", Vec::<Value>::new())).is_empty());
}

#[test]
fn test_untyped_query_form() {
    let f = fixture(true);
    let mut director = docbridge::ValueMap::new();
    director.insert("$eq".to_string(), Value::from(f.scott.clone()));
    let mut query = docbridge::ValueMap::new();
    query.insert("director".to_string(), Value::Map(director));
    query.insert("title".to_string(), Value::from("Legend"));

    let expr = Expr::from_value(Value::Map(query)).unwrap();
    assert_eq!(titles(&f.db, &expr), vec!["Legend"]);
}

#[test]
fn test_raw_query_passes_through() {
    let f = fixture(false);
    let results = f
        .db
        .filter_raw("movies", &json!({"year": {"$lt": 1980}}), None)
        .unwrap();
    assert_eq!(results.len(), 1);
}

#[test]
fn test_alias_encoder() {
    let mut f = fixture(false);
    f.db
        .add_query_encoder(Box::new(FieldAliasEncoder::new().alias("by", "director")));
    assert_eq!(titles(&f.db, &Expr::eq("by", f.cameron.clone())), vec!["Aliens"]);
}

#[test]
fn test_query_with_unsaved_record_rejected() {
    let f = fixture(false);
    let err = f
        .db
        .filter("Movie", &Expr::eq("director", Record::new("Director")), None)
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidIdentity { .. }));
}
