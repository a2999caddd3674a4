//! External store contract
//!
//! The adapter core never talks to a driver directly. Everything it needs
//! from the underlying document store is the [`DocumentStore`] trait:
//! lookups with an already-canonical query document, single-document writes,
//! unordered bulk writes and index management.
//!
//! Implementations are shared across threads (`Send + Sync`, `&self`
//! methods); any locking is the implementation's business.

use docbridge_core::{BridgeError, BridgeResult, IndexSpec, Pk, StoredDocument, StoredValue};

/// One entry of a bulk write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Replace the document with this pk, inserting it if absent
    Replace {
        /// Identity of the document
        pk: Pk,
        /// Full replacement document
        document: StoredDocument,
    },
    /// Delete the document with this pk (no-op if absent)
    Delete {
        /// Identity of the document
        pk: Pk,
    },
}

impl WriteOp {
    /// Identity targeted by this operation
    pub fn pk(&self) -> &Pk {
        match self {
            WriteOp::Replace { pk, .. } | WriteOp::Delete { pk } => pk,
        }
    }
}

/// A bulk write entry that did not apply
#[derive(Debug, Clone, PartialEq)]
pub struct WriteFailure {
    /// Position of the entry in its submitted batch
    pub index: usize,
    /// Identity of the failed entry
    pub pk: Pk,
    /// Why it failed
    pub error: BridgeError,
}

/// Per-operation outcome of a bulk write
///
/// Entries not listed in `failures` were applied; there is no rollback of
/// applied entries when others fail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkWriteReport {
    /// Replace operations applied
    pub upserted: usize,
    /// Delete operations that removed a document
    pub deleted: usize,
    /// Entries that failed
    pub failures: Vec<WriteFailure>,
}

impl BulkWriteReport {
    /// True if no entry failed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Minimal contract the adapter core needs from a document store
pub trait DocumentStore: Send + Sync {
    /// Documents in `collection` matching `query`
    ///
    /// `projection`, if given, lists the field paths to return; the `pk`
    /// field is always included.
    fn find(
        &self,
        collection: &str,
        query: &StoredValue,
        projection: Option<&[String]>,
    ) -> BridgeResult<Vec<StoredDocument>>;

    /// Insert or fully replace one document
    ///
    /// Fails with `DuplicateKey` on a unique index violation.
    fn upsert_one(&self, collection: &str, pk: &Pk, document: StoredDocument) -> BridgeResult<()>;

    /// Delete one document, returning whether it existed
    fn delete_one(&self, collection: &str, pk: &Pk) -> BridgeResult<bool>;

    /// Set and unset field paths on one document
    ///
    /// Returns whether a document matched. `set` keys and `unset` entries
    /// are dotted paths.
    fn update_one(
        &self,
        collection: &str,
        pk: &Pk,
        set: &StoredDocument,
        unset: &[String],
    ) -> BridgeResult<bool>;

    /// Apply several writes as one request
    ///
    /// With `ordered == false` every entry is attempted even if earlier
    /// entries fail. An `Err` means the request as a whole was not executed.
    fn bulk_write(
        &self,
        collection: &str,
        ops: Vec<WriteOp>,
        ordered: bool,
    ) -> BridgeResult<BulkWriteReport>;

    /// Create an index
    ///
    /// Fails with `IndexConflict` if an index on the same fields exists with
    /// different options.
    fn create_index(&self, collection: &str, spec: &IndexSpec) -> BridgeResult<()>;

    /// Drop the index on exactly these fields
    fn drop_index(&self, collection: &str, fields: &[String]) -> BridgeResult<()>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<T> {
    fn find(
        &self,
        collection: &str,
        query: &StoredValue,
        projection: Option<&[String]>,
    ) -> BridgeResult<Vec<StoredDocument>> {
        (**self).find(collection, query, projection)
    }

    fn upsert_one(&self, collection: &str, pk: &Pk, document: StoredDocument) -> BridgeResult<()> {
        (**self).upsert_one(collection, pk, document)
    }

    fn delete_one(&self, collection: &str, pk: &Pk) -> BridgeResult<bool> {
        (**self).delete_one(collection, pk)
    }

    fn update_one(
        &self,
        collection: &str,
        pk: &Pk,
        set: &StoredDocument,
        unset: &[String],
    ) -> BridgeResult<bool> {
        (**self).update_one(collection, pk, set, unset)
    }

    fn bulk_write(
        &self,
        collection: &str,
        ops: Vec<WriteOp>,
        ordered: bool,
    ) -> BridgeResult<BulkWriteReport> {
        (**self).bulk_write(collection, ops, ordered)
    }

    fn create_index(&self, collection: &str, spec: &IndexSpec) -> BridgeResult<()> {
        (**self).create_index(collection, spec)
    }

    fn drop_index(&self, collection: &str, fields: &[String]) -> BridgeResult<()> {
        (**self).drop_index(collection, fields)
    }
}
