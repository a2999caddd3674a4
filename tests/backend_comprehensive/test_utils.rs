//! Shared fixtures

use docbridge::{
    Backend, BackendConfig, CollectionRegistry, DocTypeSpec, IndexSpec, MemoryStore, StoreCall,
};
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// Install a test subscriber once; `RUST_LOG` controls verbosity
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Movies, actors and directors
pub fn registry() -> CollectionRegistry {
    CollectionRegistry::new()
        .with(
            DocTypeSpec::new("Movie", "movies")
                .index(IndexSpec::new(["title"]))
                .index(IndexSpec::new(["imdb_id"]).unique()),
        )
        .unwrap()
        .with(DocTypeSpec::new("Actor", "actors"))
        .unwrap()
        .with(DocTypeSpec::new("Director", "directors"))
        .unwrap()
}

/// Backend over a fresh in-memory store
pub fn backend(config: BackendConfig) -> Backend<MemoryStore> {
    init_tracing();
    Backend::new(Arc::new(MemoryStore::new()), registry(), config).unwrap()
}

/// Number of logged calls matching a predicate
pub fn count_calls(db: &Backend<MemoryStore>, pred: impl Fn(&StoreCall) -> bool) -> usize {
    db.store().calls().iter().filter(|c| pred(c)).count()
}
