//! In-memory document store
//!
//! A [`DocumentStore`] backed by a DashMap of per-collection shards, each
//! holding an FxHashMap from pk to stored document.
//!
//! # Design
//!
//! - DashMap: one shard per collection, collections never contend
//! - FxHashMap: O(1) lookups by pk inside a collection
//! - Unique indexes are enforced on every write
//!
//! Besides serving as the default store for tests and embedding, it records
//! every call it receives and can be told to fail a collection wholesale,
//! which is how batching and partial-commit behaviour is exercised.

use crate::matcher;
use crate::store::{BulkWriteReport, DocumentStore, WriteFailure, WriteOp};
use dashmap::DashMap;
use docbridge_core::{
    BridgeError, BridgeResult, IndexSpec, Pk, StoredDocument, StoredValue, PK_FIELD,
};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

/// One request received by a [`MemoryStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    /// `find`
    Find {
        /// Target collection
        collection: String,
        /// Query document as received
        query: StoredValue,
    },
    /// `upsert_one`
    UpsertOne {
        /// Target collection
        collection: String,
        /// Document identity
        pk: Pk,
    },
    /// `delete_one`
    DeleteOne {
        /// Target collection
        collection: String,
        /// Document identity
        pk: Pk,
    },
    /// `update_one`
    UpdateOne {
        /// Target collection
        collection: String,
        /// Document identity
        pk: Pk,
        /// `$set` document
        set: StoredDocument,
        /// `$unset` paths
        unset: Vec<String>,
    },
    /// `bulk_write`
    BulkWrite {
        /// Target collection
        collection: String,
        /// Replace operations in the request
        replaces: usize,
        /// Delete operations in the request
        deletes: usize,
    },
    /// `create_index`
    CreateIndex {
        /// Target collection
        collection: String,
        /// Requested index
        spec: IndexSpec,
    },
    /// `drop_index`
    DropIndex {
        /// Target collection
        collection: String,
        /// Index fields
        fields: Vec<String>,
    },
}

impl StoreCall {
    /// Collection the call targeted
    pub fn collection(&self) -> &str {
        match self {
            StoreCall::Find { collection, .. }
            | StoreCall::UpsertOne { collection, .. }
            | StoreCall::DeleteOne { collection, .. }
            | StoreCall::UpdateOne { collection, .. }
            | StoreCall::BulkWrite { collection, .. }
            | StoreCall::CreateIndex { collection, .. }
            | StoreCall::DropIndex { collection, .. } => collection,
        }
    }
}

/// Per-collection shard
#[derive(Debug, Default)]
pub struct Shard {
    pub(crate) docs: FxHashMap<Pk, StoredDocument>,
    pub(crate) indexes: Vec<IndexSpec>,
}

impl Shard {
    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Check if the shard is empty
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn index_key(doc: &StoredDocument, spec: &IndexSpec) -> String {
        let values: Vec<&StoredValue> = spec
            .fields
            .iter()
            .map(|(field, _)| matcher::first_at_path(doc, field).unwrap_or(&StoredValue::Null))
            .collect();
        // serde_json renders equal values identically
        serde_json::to_string(&values).unwrap_or_default()
    }

    /// Find a unique-index conflict for `doc` stored under `pk`
    fn unique_violation(&self, pk: &Pk, doc: &StoredDocument) -> Option<&IndexSpec> {
        self.indexes.iter().filter(|spec| spec.unique).find(|spec| {
            let key = Self::index_key(doc, spec);
            self.docs
                .iter()
                .any(|(other, existing)| other != pk && Self::index_key(existing, spec) == key)
        })
    }

    fn put(&mut self, collection: &str, pk: &Pk, doc: StoredDocument) -> BridgeResult<()> {
        if let Some(spec) = self.unique_violation(pk, &doc) {
            return Err(BridgeError::DuplicateKey {
                collection: collection.to_string(),
                pk: format!("{} (index on {})", pk, spec.field_names().join(",")),
            });
        }
        self.docs.insert(pk.clone(), doc);
        Ok(())
    }

    fn has_duplicates(&self, spec: &IndexSpec) -> bool {
        let mut seen = FxHashSet::default();
        !self
            .docs
            .values()
            .all(|doc| seen.insert(Self::index_key(doc, spec)))
    }
}

/// Thread-safe in-memory [`DocumentStore`]
///
/// # Example
///
/// ```ignore
/// use docbridge_storage::MemoryStore;
/// use std::sync::Arc;
///
/// let store = Arc::new(MemoryStore::new());
/// store.set_unavailable("movies", true);
/// ```
pub struct MemoryStore {
    shards: DashMap<String, Shard>,
    unavailable: Mutex<FxHashSet<String>>,
    calls: Mutex<Vec<StoreCall>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            shards: DashMap::new(),
            unavailable: Mutex::new(FxHashSet::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Forget the recorded calls
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Number of documents in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.shards.get(collection).map(|s| s.len()).unwrap_or(0)
    }

    /// Raw stored form of one document
    pub fn raw(&self, collection: &str, pk: &Pk) -> Option<StoredDocument> {
        self.shards
            .get(collection)
            .and_then(|shard| shard.docs.get(pk).cloned())
    }

    /// Indexes currently defined on a collection
    pub fn indexes(&self, collection: &str) -> Vec<IndexSpec> {
        self.shards
            .get(collection)
            .map(|shard| shard.indexes.clone())
            .unwrap_or_default()
    }

    // ========================================================================
    // Fault injection
    // ========================================================================

    /// Make every request against `collection` fail with a storage error
    pub fn set_unavailable(&self, collection: &str, unavailable: bool) {
        let mut set = self.unavailable.lock();
        if unavailable {
            set.insert(collection.to_string());
        } else {
            set.remove(collection);
        }
    }

    fn check_available(&self, collection: &str) -> BridgeResult<()> {
        if self.unavailable.lock().contains(collection) {
            return Err(BridgeError::storage(format!(
                "collection '{}' is unavailable",
                collection
            )));
        }
        Ok(())
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().push(call);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("collections", &self.shards.len())
            .field("calls", &self.calls.lock().len())
            .finish()
    }
}

impl DocumentStore for MemoryStore {
    fn find(
        &self,
        collection: &str,
        query: &StoredValue,
        projection: Option<&[String]>,
    ) -> BridgeResult<Vec<StoredDocument>> {
        self.record(StoreCall::Find {
            collection: collection.to_string(),
            query: query.clone(),
        });
        self.check_available(collection)?;

        let Some(shard) = self.shards.get(collection) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<(&Pk, &StoredDocument)> = Vec::new();
        for (pk, doc) in shard.docs.iter() {
            if matcher::matches(doc, query)? {
                hits.push((pk, doc));
            }
        }
        hits.sort_by(|a, b| a.0.cmp(b.0));
        Ok(hits
            .into_iter()
            .map(|(_, doc)| match projection {
                Some(fields) => matcher::project(doc, fields, PK_FIELD),
                None => doc.clone(),
            })
            .collect())
    }

    fn upsert_one(&self, collection: &str, pk: &Pk, document: StoredDocument) -> BridgeResult<()> {
        self.record(StoreCall::UpsertOne {
            collection: collection.to_string(),
            pk: pk.clone(),
        });
        self.check_available(collection)?;
        self.shards
            .entry(collection.to_string())
            .or_default()
            .put(collection, pk, document)
    }

    fn delete_one(&self, collection: &str, pk: &Pk) -> BridgeResult<bool> {
        self.record(StoreCall::DeleteOne {
            collection: collection.to_string(),
            pk: pk.clone(),
        });
        self.check_available(collection)?;
        Ok(self
            .shards
            .get_mut(collection)
            .map(|mut shard| shard.docs.remove(pk).is_some())
            .unwrap_or(false))
    }

    fn update_one(
        &self,
        collection: &str,
        pk: &Pk,
        set: &StoredDocument,
        unset: &[String],
    ) -> BridgeResult<bool> {
        self.record(StoreCall::UpdateOne {
            collection: collection.to_string(),
            pk: pk.clone(),
            set: set.clone(),
            unset: unset.to_vec(),
        });
        self.check_available(collection)?;

        let Some(mut shard) = self.shards.get_mut(collection) else {
            return Ok(false);
        };
        let Some(mut doc) = shard.docs.get(pk).cloned() else {
            return Ok(false);
        };
        for (path, value) in set {
            matcher::set_path(&mut doc, path, value.clone());
        }
        for path in unset {
            matcher::unset_path(&mut doc, path);
        }
        shard.put(collection, pk, doc)?;
        Ok(true)
    }

    fn bulk_write(
        &self,
        collection: &str,
        ops: Vec<WriteOp>,
        ordered: bool,
    ) -> BridgeResult<BulkWriteReport> {
        let replaces = ops
            .iter()
            .filter(|op| matches!(op, WriteOp::Replace { .. }))
            .count();
        self.record(StoreCall::BulkWrite {
            collection: collection.to_string(),
            replaces,
            deletes: ops.len() - replaces,
        });
        self.check_available(collection)?;

        let mut shard = self.shards.entry(collection.to_string()).or_default();
        let mut report = BulkWriteReport::default();
        for (index, op) in ops.into_iter().enumerate() {
            match op {
                WriteOp::Replace { pk, document } => {
                    match shard.put(collection, &pk, document) {
                        Ok(()) => report.upserted += 1,
                        Err(error) => {
                            report.failures.push(WriteFailure { index, pk, error });
                            if ordered {
                                break;
                            }
                        }
                    }
                }
                WriteOp::Delete { pk } => {
                    if shard.docs.remove(&pk).is_some() {
                        report.deleted += 1;
                    }
                }
            }
        }
        Ok(report)
    }

    fn create_index(&self, collection: &str, spec: &IndexSpec) -> BridgeResult<()> {
        self.record(StoreCall::CreateIndex {
            collection: collection.to_string(),
            spec: spec.clone(),
        });
        self.check_available(collection)?;

        let mut shard = self.shards.entry(collection.to_string()).or_default();
        if let Some(existing) = shard.indexes.iter().find(|i| i.fields == spec.fields) {
            if existing == spec {
                return Ok(());
            }
            return Err(BridgeError::IndexConflict {
                collection: collection.to_string(),
                message: format!(
                    "index on {} exists with different options",
                    spec.field_names().join(",")
                ),
            });
        }
        if spec.unique && shard.has_duplicates(spec) {
            return Err(BridgeError::IndexConflict {
                collection: collection.to_string(),
                message: format!(
                    "existing documents violate unique index on {}",
                    spec.field_names().join(",")
                ),
            });
        }
        shard.indexes.push(spec.clone());
        Ok(())
    }

    fn drop_index(&self, collection: &str, fields: &[String]) -> BridgeResult<()> {
        self.record(StoreCall::DropIndex {
            collection: collection.to_string(),
            fields: fields.to_vec(),
        });
        self.check_available(collection)?;

        let mut shard = self.shards.entry(collection.to_string()).or_default();
        let before = shard.indexes.len();
        shard
            .indexes
            .retain(|i| i.fields.iter().map(|(f, _)| f).ne(fields.iter()));
        if shard.indexes.len() == before {
            return Err(BridgeError::storage(format!(
                "index on {} not found in '{}'",
                fields.join(","),
                collection
            )));
        }
        Ok(())
    }
}
