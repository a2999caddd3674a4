//! docbridge: document-store adapter
//!
//! Maps application records onto collections of an external document store.
//! Writes are applied immediately or staged in a transaction; references
//! between records are stored as typed reference objects and resolved lazily;
//! queries that compare fields against records are rewritten to match the
//! stored reference form.
//!
//! # Example
//!
//! ```ignore
//! use docbridge::{Backend, BackendConfig, CollectionRegistry, DocTypeSpec, Expr, MemoryStore, Record};
//! use std::sync::Arc;
//!
//! let registry = CollectionRegistry::new().with(DocTypeSpec::new("Movie", "movies"))?;
//! let mut db = Backend::new(Arc::new(MemoryStore::new()), registry, BackendConfig::default())?;
//!
//! db.begin()?;
//! db.save(&mut Record::new("Movie").attr("title", "Alien"))?;
//! db.commit()?;
//!
//! let alien = db.get("Movie", &Expr::eq("title", "Alien"))?;
//! ```

// ============================================================================
// Data model and errors
// ============================================================================

pub use docbridge_core::{
    BridgeError, BridgeResult, CollectionRegistry, DocTypeSpec, Expr, IndexDirection, IndexSpec,
    Operator, Pk, Record, RefMode, Reference, ReferenceCodec, ReferenceResolver, StoredDocument,
    StoredValue, Value, ValueMap, PK_FIELD,
};

/// Dot escaping for stored map keys
pub use docbridge_core::keys;

// ============================================================================
// Store contract
// ============================================================================

pub use docbridge_storage::{
    BatchExecutor, BatchFailure, BatchOutcome, BulkWriteReport, DocumentStore, MemoryStore,
    StoreCall, WriteFailure, WriteOp, DEFAULT_BATCH_SIZE,
};

// ============================================================================
// Deferred writes
// ============================================================================

pub use docbridge_transaction::{
    CollectionFailure, DeferredWriteBuffer, EntryFailure, FlushReport, Intent, PendingCounts,
    PendingUpdate, SuppressedIntent,
};

// ============================================================================
// Backend
// ============================================================================

pub use docbridge_engine::{
    Backend, BackendConfig, BackendHook, BoundedCache, FieldAliasEncoder, QueryCanonicalizer,
    QueryEncoder, QuerySet, SaveOutcome, SetFields, DEFAULT_CACHE_CAPACITY,
};
