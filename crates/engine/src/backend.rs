//! Document backend
//!
//! [`Backend`] is the adapter applications talk to. It maps records to
//! collections through the registry, encodes them with the reference codec
//! and either writes them to the store immediately (autocommit) or stages
//! them in a deferred-write buffer until `commit`.
//!
//! # Write modes
//!
//! - autocommit outside `begin`: every write goes straight to the store
//! - inside `begin`/`commit`, or with `autocommit = false`: writes are
//!   staged and applied by `commit`
//!
//! # Reads
//!
//! Reads always go to the store; staged writes are not visible to them.
//! References in loaded records stay lazy until resolved with
//! [`Backend::resolve_references`], [`Backend::load_field`] or
//! [`Backend::resolve`]. Resolved records are cached per
//! `(collection, pk)` when caching is enabled; every write invalidates the
//! affected entry.

use crate::cache::BoundedCache;
use crate::canonical::{QueryCanonicalizer, QueryEncoder};
use crate::config::BackendConfig;
use crate::hooks::BackendHook;
use crate::queryset::QuerySet;
use docbridge_core::{
    BridgeError, BridgeResult, CollectionRegistry, Expr, IndexSpec, Pk, RefMode, Record,
    Reference, ReferenceCodec, ReferenceResolver, StoredDocument, StoredValue, Value, ValueMap,
    PK_FIELD,
};
use docbridge_storage::{BatchExecutor, BatchFailure, DocumentStore};
use docbridge_transaction::{DeferredWriteBuffer, FlushReport};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fields written by [`Backend::update`]
#[derive(Debug, Clone, PartialEq)]
pub enum SetFields {
    /// Field paths whose current values are read from the record
    Names(Vec<String>),
    /// Explicit values keyed by field path
    Values(ValueMap),
}

impl SetFields {
    /// Set nothing
    pub fn none() -> Self {
        SetFields::Names(Vec::new())
    }

    /// Read these paths from the record
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SetFields::Names(names.into_iter().map(Into::into).collect())
    }

    /// Values by field path
    pub fn values<I, S, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<Value>,
    {
        SetFields::Values(
            values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Resolve into values; names missing from the record are skipped
    fn resolve(self, record: &Record) -> ValueMap {
        match self {
            SetFields::Names(names) => names
                .into_iter()
                .filter_map(|name| {
                    let value = record.get_path(&name)?.clone();
                    Some((name, value))
                })
                .collect(),
            SetFields::Values(values) => values,
        }
    }
}

/// Result of [`Backend::save_multiple`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveOutcome {
    /// Identities of the saved records, in input order
    pub identities: Vec<Pk>,
    /// Bulk failures per collection
    pub failures: Vec<(String, BatchFailure)>,
}

impl SaveOutcome {
    /// True if nothing failed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

type CacheKey = (String, Pk);

/// Adapter between records and a [`DocumentStore`]
pub struct Backend<S: DocumentStore> {
    store: Arc<S>,
    registry: Arc<CollectionRegistry>,
    codec: ReferenceCodec,
    canonicalizer: QueryCanonicalizer,
    config: BackendConfig,
    batch: BatchExecutor,
    buffer: DeferredWriteBuffer,
    in_transaction: bool,
    hooks: Vec<Box<dyn BackendHook>>,
    cache: Mutex<BoundedCache<CacheKey, Record>>,
    last_report: Option<FlushReport>,
}

impl<S: DocumentStore> Backend<S> {
    /// Create a backend
    ///
    /// # Errors
    ///
    /// `Config` if the configuration is inconsistent.
    pub fn new(
        store: Arc<S>,
        registry: CollectionRegistry,
        config: BackendConfig,
    ) -> BridgeResult<Self> {
        config.validate()?;
        let registry = Arc::new(registry);
        let codec = ReferenceCodec::new(
            Arc::clone(&registry),
            RefMode::from_flag(config.use_pk_based_refs),
        );
        let cache_capacity = if config.enable_caching {
            config.cache_capacity
        } else {
            0
        };
        Ok(Self {
            store,
            canonicalizer: QueryCanonicalizer::new(codec.clone()),
            codec,
            registry,
            batch: BatchExecutor::new(config.batch_size)?,
            config,
            buffer: DeferredWriteBuffer::new(),
            in_transaction: false,
            hooks: Vec::new(),
            cache: Mutex::new(BoundedCache::new(cache_capacity)),
            last_report: None,
        })
    }

    // ========================================================================
    // Accessors and registration
    // ========================================================================

    /// Underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Collection registry
    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    /// Reference codec
    pub fn codec(&self) -> &ReferenceCodec {
        &self.codec
    }

    /// Active configuration
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Staged writes
    pub fn buffer(&self) -> &DeferredWriteBuffer {
        &self.buffer
    }

    /// Report of the last commit attempt
    pub fn last_flush_report(&self) -> Option<&FlushReport> {
        self.last_report.as_ref()
    }

    /// Register a write hook
    pub fn add_hook(&mut self, hook: Box<dyn BackendHook>) {
        self.hooks.push(hook);
    }

    /// Register a query pre-encoder
    pub fn add_query_encoder(&mut self, encoder: Box<dyn QueryEncoder>) {
        self.canonicalizer.add_encoder(encoder);
    }

    /// Canonical form of a query
    pub fn canonicalize(&self, query: &Expr) -> BridgeResult<Expr> {
        self.canonicalizer.canonicalize(query)
    }

    fn collection_name(&self, target: &str) -> BridgeResult<String> {
        self.registry.resolve_collection(target).map(str::to_string)
    }

    fn collection_of(&self, record: &Record) -> BridgeResult<String> {
        self.registry
            .collection_for(record.doc_type())
            .map(str::to_string)
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// True if writes are currently staged instead of applied
    pub fn is_deferred(&self) -> bool {
        self.in_transaction || !self.config.autocommit
    }

    /// True between `begin` and a successful `commit` or `rollback`
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Start staging writes
    ///
    /// # Errors
    ///
    /// `TransactionActive` if a transaction is already open.
    pub fn begin(&mut self) -> BridgeResult<()> {
        if self.in_transaction {
            return Err(BridgeError::TransactionActive);
        }
        self.in_transaction = true;
        debug!("transaction started");
        Ok(())
    }

    /// Flush staged writes to the store
    ///
    /// Collections that failed at transport level stay buffered and the
    /// transaction stays open, so `commit` can be called again.
    ///
    /// # Errors
    ///
    /// - `NotInTransaction` if writes are not being staged
    /// - `PartialCommit` listing the collections that could not be written
    pub fn commit(&mut self) -> BridgeResult<FlushReport> {
        if !self.is_deferred() {
            return Err(BridgeError::NotInTransaction);
        }
        let staged: Vec<CacheKey> = self
            .buffer
            .staged_keys()
            .into_iter()
            .map(|(collection, pk)| (collection.to_string(), pk.clone()))
            .collect();
        let report = self.buffer.flush(self.store.as_ref(), &self.batch);
        self.last_report = Some(report.clone());
        {
            let mut cache = self.cache.lock();
            for key in &staged {
                cache.invalidate(key);
            }
        }

        if report.has_pending_collections() {
            let failed = report.failed_collection_names();
            warn!(failed = ?failed, "commit left collections pending");
            return Err(BridgeError::PartialCommit { failed });
        }
        for failure in &report.entry_failures {
            warn!(
                collection = %failure.collection,
                pk = %failure.pk,
                error = %failure.error,
                "staged write rejected"
            );
        }
        info!(
            saved = report.saved,
            updated = report.updated,
            deleted = report.deleted,
            suppressed = report.suppressed.len(),
            "transaction committed"
        );
        self.in_transaction = false;
        Ok(report)
    }

    /// Discard staged writes
    ///
    /// # Errors
    ///
    /// `NotInTransaction` if writes are not being staged.
    pub fn rollback(&mut self) -> BridgeResult<()> {
        if !self.is_deferred() {
            return Err(BridgeError::NotInTransaction);
        }
        let pending = self.buffer.pending_operations().total();
        self.buffer.clear();
        self.in_transaction = false;
        debug!(discarded = pending, "transaction rolled back");
        Ok(())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Save one record, assigning a pk if it has none
    ///
    /// # Errors
    ///
    /// - `DuplicateKey` on a unique index violation (immediate mode)
    /// - `UnknownDocumentType` if the record's type is not registered
    /// - any error from a `before_save` hook
    pub fn save(&mut self, record: &mut Record) -> BridgeResult<Pk> {
        self.run_before_save(record)?;
        let collection = self.collection_of(record)?;
        record.ensure_pk();
        let (pk, document) = self.codec.encode_document(record)?;
        self.invalidate(&collection, &pk);

        if self.is_deferred() {
            self.buffer.stage_save(&collection, pk.clone(), document);
        } else {
            self.store.upsert_one(&collection, &pk, document)?;
            debug!(collection = %collection, pk = %pk, "saved");
        }
        Ok(pk)
    }

    /// Save several records, grouped by collection
    ///
    /// In immediate mode with batching enabled each collection is written
    /// with chunked unordered bulk requests; failed entries are reported in
    /// the outcome and do not stop the others. Without batching records are
    /// upserted one by one and the first failure is returned.
    ///
    /// Records without a pk get one. Collections are written in name order,
    /// so an encoding error leaves earlier collections written.
    pub fn save_multiple(&mut self, records: &mut [Record]) -> BridgeResult<SaveOutcome> {
        let mut grouped: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (slot, record) in records.iter_mut().enumerate() {
            self.run_before_save(record)?;
            let collection = self.collection_of(record)?;
            grouped.entry(collection).or_default().push(slot);
        }

        let mut outcome = SaveOutcome::default();
        if !self.is_deferred() && self.config.enable_batch_operations {
            for (collection, slots) in grouped {
                let mut group: Vec<Record> = slots.iter().map(|&i| records[i].clone()).collect();
                let codec = &self.codec;
                let result = self.batch.save_records(
                    self.store.as_ref(),
                    &collection,
                    &mut group,
                    |record| codec.encode_document(record).map(|(_, document)| document),
                )?;
                for pk in &result.identities {
                    self.invalidate(&collection, pk);
                }
                outcome
                    .failures
                    .extend(result.failures.into_iter().map(|f| (collection.clone(), f)));
                for (slot, record) in slots.into_iter().zip(group) {
                    records[slot] = record;
                }
            }
        } else {
            for (collection, slots) in grouped {
                for slot in slots {
                    records[slot].ensure_pk();
                    let (pk, document) = self.codec.encode_document(&records[slot])?;
                    self.invalidate(&collection, &pk);
                    if self.is_deferred() {
                        self.buffer.stage_save(&collection, pk, document);
                    } else {
                        self.store.upsert_one(&collection, &pk, document)?;
                    }
                }
            }
        }
        outcome.identities = records.iter().filter_map(|r| r.pk().cloned()).collect();
        Ok(outcome)
    }

    /// Update fields of a stored record
    ///
    /// # Arguments
    ///
    /// * `record` - Record to update; must have a pk
    /// * `set` - Paths to write, either read from the record or given
    /// * `unset` - Paths to remove
    /// * `update_obj` - Also apply the change to `record` in memory
    ///
    /// A call that sets and unsets nothing does nothing.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentity` if the record has no pk
    /// - `DoesNotExist` if the pk is staged for deletion, or (immediate mode)
    ///   if no stored document has that pk
    pub fn update(
        &mut self,
        record: &mut Record,
        set: SetFields,
        unset: &[String],
        update_obj: bool,
    ) -> BridgeResult<()> {
        let collection = self.collection_of(record)?;
        let pk = record.pk().cloned().ok_or_else(|| {
            BridgeError::invalid_identity(&collection, "update() called on a record without pk")
        })?;

        let set_values = set.resolve(record);
        for hook in &self.hooks {
            hook.before_update(record, &set_values, unset)?;
        }
        if set_values.is_empty() && unset.is_empty() {
            return Ok(());
        }

        let mut set_doc = StoredDocument::new();
        for (path, value) in &set_values {
            set_doc.insert(path.clone(), self.codec.encode(value)?);
        }
        self.invalidate(&collection, &pk);

        if self.is_deferred() {
            self.buffer
                .stage_update(&collection, pk.clone(), set_doc, unset.to_vec())?;
        } else if !self.store.update_one(&collection, &pk, &set_doc, unset)? {
            return Err(BridgeError::does_not_exist(
                &collection,
                Some(pk.as_str()),
                "no stored document to update",
            ));
        }

        if update_obj {
            for (path, value) in set_values {
                record.set_path(&path, value);
            }
            for path in unset {
                record.remove_path(path);
            }
        }
        Ok(())
    }

    /// Delete a record
    ///
    /// # Errors
    ///
    /// `InvalidIdentity` if the record has no pk.
    pub fn delete(&mut self, record: &Record) -> BridgeResult<()> {
        for hook in &self.hooks {
            hook.before_delete(record)?;
        }
        let collection = self.collection_of(record)?;
        let pk = record.pk().cloned();

        if self.is_deferred() {
            if let Some(pk) = &pk {
                self.invalidate(&collection, pk);
            }
            return self.buffer.stage_delete(&collection, pk);
        }

        let pk = pk.ok_or_else(|| {
            BridgeError::invalid_identity(&collection, "cannot delete a record without pk")
        })?;
        self.invalidate(&collection, &pk);
        self.store.delete_one(&collection, &pk)?;
        debug!(collection = %collection, pk = %pk, "deleted");
        Ok(())
    }

    /// Delete documents by pk without loading them
    ///
    /// `target` is a document type or a collection name.
    pub fn delete_by_primary_keys(&mut self, target: &str, pks: &[Pk]) -> BridgeResult<()> {
        let collection = self.collection_name(target)?;
        for pk in pks {
            self.invalidate(&collection, pk);
        }

        if self.is_deferred() {
            for pk in pks {
                self.buffer.stage_delete(&collection, Some(pk.clone()))?;
            }
            return Ok(());
        }

        if self.config.enable_batch_operations {
            let outcome = self.batch.delete(self.store.as_ref(), &collection, pks);
            if let Some(failure) = outcome.failures.into_iter().find(BatchFailure::is_transport) {
                return Err(failure.error);
            }
        } else {
            for pk in pks {
                self.store.delete_one(&collection, pk)?;
            }
        }
        Ok(())
    }

    fn run_before_save(&self, record: &mut Record) -> BridgeResult<()> {
        for hook in &self.hooks {
            hook.before_save(record)?;
        }
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Records matching a query
    ///
    /// # Arguments
    ///
    /// * `target` - Document type or collection name
    /// * `query` - Query tree; canonicalized before it is sent
    /// * `only` - Field paths to load (the pk is always loaded)
    pub fn filter(
        &self,
        target: &str,
        query: &Expr,
        only: Option<&[String]>,
    ) -> BridgeResult<QuerySet> {
        let canonical = self.canonicalizer.canonicalize(query)?;
        let rendered = canonical.to_storage(&self.codec)?;
        self.filter_raw(target, &rendered, only)
    }

    /// Records matching an already-canonical storage query
    pub fn filter_raw(
        &self,
        target: &str,
        query: &StoredValue,
        only: Option<&[String]>,
    ) -> BridgeResult<QuerySet> {
        let collection = self.collection_name(target)?;
        self.find_documents(collection, query, only)
    }

    /// Records of one collection matching a query
    ///
    /// Unlike [`filter`](Self::filter) the name is never read as a
    /// document type.
    fn filter_collection(
        &self,
        collection: &str,
        query: &Expr,
        only: Option<&[String]>,
    ) -> BridgeResult<QuerySet> {
        self.registry.doc_type_for(collection)?;
        let canonical = self.canonicalizer.canonicalize(query)?;
        let rendered = canonical.to_storage(&self.codec)?;
        self.find_documents(collection.to_string(), &rendered, only)
    }

    fn find_documents(
        &self,
        collection: String,
        query: &StoredValue,
        only: Option<&[String]>,
    ) -> BridgeResult<QuerySet> {
        let documents = self.store.find(&collection, query, only)?;
        debug!(collection = %collection, hits = documents.len(), "filter");
        Ok(QuerySet::new(
            collection,
            self.codec.clone(),
            documents,
            only.map(<[String]>::to_vec),
        ))
    }

    /// The single record matching a query
    ///
    /// # Errors
    ///
    /// - `DoesNotExist` if nothing matches
    /// - `MultipleDocumentsReturned` if more than one document matches
    pub fn get(&self, target: &str, query: &Expr) -> BridgeResult<Record> {
        single_result(self.filter(target, query, None)?)
    }

    /// The record with this pk
    pub fn get_by_pk(&self, target: &str, pk: &Pk) -> BridgeResult<Record> {
        self.get(target, &Expr::eq(PK_FIELD, pk.as_str()))
            .map_err(|e| tag_missing_pk(e, pk))
    }

    fn get_in_collection(&self, collection: &str, pk: &Pk) -> BridgeResult<Record> {
        let results = self.filter_collection(collection, &Expr::eq(PK_FIELD, pk.as_str()), None)?;
        single_result(results).map_err(|e| tag_missing_pk(e, pk))
    }

    /// Load the record a reference points to
    ///
    /// Served from the cache when caching is enabled.
    ///
    /// # Errors
    ///
    /// `DoesNotExist`, tagged with the reference's collection, if the
    /// target is gone.
    pub fn resolve(&self, reference: &Reference) -> BridgeResult<Record> {
        let key = (reference.collection.clone(), reference.pk.clone());
        if let Some(hit) = self.cache.lock().get(&key) {
            return Ok(hit);
        }
        let record = self.get_in_collection(&reference.collection, &reference.pk)?;
        // the stored copy of a staged pk goes stale at commit
        if self.buffer.state_of(&reference.collection, &reference.pk).is_none() {
            self.cache.lock().set(key, record.clone());
        }
        Ok(record)
    }

    /// Value of one field with its references resolved
    ///
    /// A field missing from the record (for example because it was loaded
    /// with a projection) is fetched from the store. A field missing there
    /// too yields `Value::Null`.
    pub fn load_field(&self, record: &Record, field: &str) -> BridgeResult<Value> {
        let value = match record.get_path(field) {
            Some(value) => value.clone(),
            None => self.fetch_field(record, field)?,
        };
        self.codec.resolve(&value, self)
    }

    fn fetch_field(&self, record: &Record, field: &str) -> BridgeResult<Value> {
        let collection = self.collection_of(record)?;
        let pk = record.pk().ok_or_else(|| {
            BridgeError::invalid_identity(&collection, "cannot load a field without pk")
        })?;
        let only = [field.to_string()];
        let query = Expr::eq(PK_FIELD, pk.as_str());
        let results = self.filter_collection(&collection, &query, Some(&only[..]))?;
        let loaded = results.first().ok_or_else(|| {
            BridgeError::does_not_exist(&collection, Some(pk.as_str()), "record is gone")
        })??;
        Ok(loaded.get_path(field).cloned().unwrap_or_default())
    }

    /// Resolve every top-level reference field of a record in place
    ///
    /// Fields that fail to resolve are left as they are and returned with
    /// their error; the other fields are still resolved.
    pub fn resolve_references(&self, record: &mut Record) -> Vec<(String, BridgeError)> {
        let fields: Vec<String> = record
            .attributes()
            .iter()
            .filter(|(_, v)| holds_reference(v))
            .map(|(k, _)| k.clone())
            .collect();

        let mut errors = Vec::new();
        for field in fields {
            let Some(value) = record.get(&field).cloned() else {
                continue;
            };
            match self.codec.resolve(&value, self) {
                Ok(resolved) => record.set(field, resolved),
                Err(error) => {
                    debug!(field = %field, error = %error, "reference not resolved");
                    errors.push((field, error));
                }
            }
        }
        errors
    }

    // ========================================================================
    // Cache
    // ========================================================================

    fn invalidate(&self, collection: &str, pk: &Pk) {
        self.cache
            .lock()
            .invalidate(&(collection.to_string(), pk.clone()));
    }

    /// Drop every cached record
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Number of cached records
    pub fn cached_records(&self) -> usize {
        self.cache.lock().len()
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    /// Create an index
    ///
    /// If the store rejects it (typically because an index on the same
    /// fields exists with other options) the existing index is dropped and
    /// creation is retried once.
    pub fn create_index(&self, target: &str, spec: &IndexSpec) -> BridgeResult<()> {
        let collection = self.collection_name(target)?;
        match self.store.create_index(&collection, spec) {
            Ok(()) => Ok(()),
            Err(error) => {
                warn!(
                    collection = %collection,
                    fields = ?spec.field_names(),
                    error = %error,
                    "index creation failed, dropping and recreating"
                );
                let fields: Vec<String> =
                    spec.fields.iter().map(|(field, _)| field.clone()).collect();
                if let Err(drop_error) = self.store.drop_index(&collection, &fields) {
                    debug!(collection = %collection, error = %drop_error, "drop before recreate failed");
                }
                self.store.create_index(&collection, spec)
            }
        }
    }

    /// Create several indexes on one target
    pub fn create_indexes(&self, target: &str, specs: &[IndexSpec]) -> BridgeResult<()> {
        for spec in specs {
            self.create_index(target, spec)?;
        }
        Ok(())
    }

    /// Create the indexes every registered type needs
    ///
    /// With `include_pk`, a unique index on `pk` is created first for each
    /// collection; then the indexes the type declares.
    pub fn ensure_indexes(&self, include_pk: bool) -> BridgeResult<()> {
        let registry = Arc::clone(&self.registry);
        for spec in registry.specs() {
            if include_pk {
                self.create_index(&spec.collection, &IndexSpec::new([PK_FIELD]).unique())?;
            }
            self.create_indexes(&spec.collection, &spec.indexes)?;
        }
        Ok(())
    }

    /// Drop the index on exactly these fields
    pub fn drop_index(&self, target: &str, fields: &[String]) -> BridgeResult<()> {
        let collection = self.collection_name(target)?;
        self.store.drop_index(&collection, fields)
    }
}

impl<S: DocumentStore> ReferenceResolver for Backend<S> {
    fn resolve(&self, reference: &Reference) -> BridgeResult<Record> {
        Backend::resolve(self, reference)
    }
}

impl<S: DocumentStore> std::fmt::Debug for Backend<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("config", &self.config)
            .field("in_transaction", &self.in_transaction)
            .field("pending", &self.buffer.pending_operations())
            .field("hooks", &self.hooks.len())
            .field("canonicalizer", &self.canonicalizer)
            .finish()
    }
}

fn single_result(results: QuerySet) -> BridgeResult<Record> {
    match results.len() {
        0 => Err(BridgeError::does_not_exist(
            results.collection(),
            None,
            "no document matches the query",
        )),
        1 => results.get(0).unwrap_or_else(|| {
            Err(BridgeError::does_not_exist(results.collection(), None, "result vanished"))
        }),
        count => Err(BridgeError::MultipleDocumentsReturned {
            collection: results.collection().to_string(),
            count,
        }),
    }
}

fn tag_missing_pk(error: BridgeError, pk: &Pk) -> BridgeError {
    match error {
        BridgeError::DoesNotExist { collection, .. } => {
            BridgeError::does_not_exist(collection, Some(pk.as_str()), "no document with this pk")
        }
        other => other,
    }
}

fn holds_reference(value: &Value) -> bool {
    match value {
        Value::Reference(_) => true,
        Value::Array(items) => items.iter().any(|v| matches!(v, Value::Reference(_))),
        _ => false,
    }
}
