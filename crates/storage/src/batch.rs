//! Chunked unordered bulk writes
//!
//! Splits large save/delete requests into consecutive chunks of at most
//! `chunk_size` operations and submits each as one unordered bulk write.
//! Failures are collected per chunk and logged; a failing chunk never stops
//! later chunks from being submitted.

use crate::store::{DocumentStore, WriteOp};
use docbridge_core::{BridgeError, BridgeResult, Pk, Record, StoredDocument};
use tracing::{debug, warn};

/// Default number of operations per bulk request
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// One failure observed while submitting a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    /// Zero-based chunk the failure belongs to
    pub chunk: usize,
    /// Failed entry, or `None` when the whole chunk was rejected
    pub pk: Option<Pk>,
    /// Cause reported by the store
    pub error: BridgeError,
}

impl BatchFailure {
    /// True if the whole chunk failed rather than a single entry
    pub fn is_transport(&self) -> bool {
        self.pk.is_none()
    }
}

/// Result of a chunked submission
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// Identities in submission order
    pub identities: Vec<Pk>,
    /// Number of operations in each submitted chunk
    pub chunk_sizes: Vec<usize>,
    /// Entry-level and chunk-level failures
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    /// True if nothing failed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// True if at least one chunk was rejected as a whole
    pub fn has_transport_failure(&self) -> bool {
        self.failures.iter().any(BatchFailure::is_transport)
    }

    /// Identities that were not written
    pub fn failed_pks(&self) -> Vec<Pk> {
        let mut out = Vec::new();
        let mut offset = 0;
        for (chunk, size) in self.chunk_sizes.iter().enumerate() {
            for failure in self.failures.iter().filter(|f| f.chunk == chunk) {
                match &failure.pk {
                    Some(pk) => out.push(pk.clone()),
                    None => out.extend(self.identities[offset..offset + size].iter().cloned()),
                }
            }
            offset += size;
        }
        out
    }
}

/// Chunking bulk writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchExecutor {
    chunk_size: usize,
}

impl BatchExecutor {
    /// Create an executor submitting at most `chunk_size` operations per request
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `chunk_size` is zero.
    pub fn new(chunk_size: usize) -> BridgeResult<Self> {
        if chunk_size == 0 {
            return Err(BridgeError::invalid_input("batch size must be at least 1"));
        }
        Ok(Self { chunk_size })
    }

    /// Operations per request
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Save records in chunks
    ///
    /// Every record lacking a pk gets one before any chunk is built, so the
    /// returned identities are complete even if some chunks fail.
    ///
    /// # Arguments
    ///
    /// * `store` - Target store
    /// * `collection` - Collection all records belong to
    /// * `records` - Records to save; pks are assigned in place
    /// * `encode` - Converts a record into its stored form
    ///
    /// # Errors
    ///
    /// An encoding error aborts the call before anything is submitted.
    pub fn save_records<S, F>(
        &self,
        store: &S,
        collection: &str,
        records: &mut [Record],
        encode: F,
    ) -> BridgeResult<BatchOutcome>
    where
        S: DocumentStore + ?Sized,
        F: Fn(&Record) -> BridgeResult<StoredDocument>,
    {
        for record in records.iter_mut() {
            record.ensure_pk();
        }
        let mut documents = Vec::with_capacity(records.len());
        for record in records.iter() {
            let pk = record
                .pk()
                .cloned()
                .ok_or_else(|| BridgeError::invalid_identity(collection, "record has no pk"))?;
            documents.push((pk, encode(record)?));
        }
        Ok(self.save_documents(store, collection, documents))
    }

    /// Upsert already-encoded documents in chunks
    pub fn save_documents<S>(
        &self,
        store: &S,
        collection: &str,
        documents: Vec<(Pk, StoredDocument)>,
    ) -> BatchOutcome
    where
        S: DocumentStore + ?Sized,
    {
        let ops = documents
            .into_iter()
            .map(|(pk, document)| WriteOp::Replace { pk, document })
            .collect();
        self.submit(store, collection, ops)
    }

    /// Delete documents by pk in chunks
    pub fn delete<S>(&self, store: &S, collection: &str, pks: &[Pk]) -> BatchOutcome
    where
        S: DocumentStore + ?Sized,
    {
        let ops = pks
            .iter()
            .map(|pk| WriteOp::Delete { pk: pk.clone() })
            .collect();
        self.submit(store, collection, ops)
    }

    fn submit<S>(&self, store: &S, collection: &str, ops: Vec<WriteOp>) -> BatchOutcome
    where
        S: DocumentStore + ?Sized,
    {
        let mut outcome = BatchOutcome {
            identities: ops.iter().map(|op| op.pk().clone()).collect(),
            ..Default::default()
        };

        let mut remaining = ops.into_iter().peekable();
        let mut chunk = 0;
        while remaining.peek().is_some() {
            let batch: Vec<WriteOp> = remaining.by_ref().take(self.chunk_size).collect();
            outcome.chunk_sizes.push(batch.len());
            debug!(collection = %collection, chunk, size = batch.len(), "submitting bulk write");

            match store.bulk_write(collection, batch, false) {
                Ok(report) => {
                    for failure in report.failures {
                        warn!(
                            collection = %collection,
                            chunk,
                            pk = %failure.pk,
                            error = %failure.error,
                            "bulk write entry failed"
                        );
                        outcome.failures.push(BatchFailure {
                            chunk,
                            pk: Some(failure.pk),
                            error: failure.error,
                        });
                    }
                }
                Err(error) => {
                    warn!(collection = %collection, chunk, error = %error, "bulk write failed");
                    outcome.failures.push(BatchFailure {
                        chunk,
                        pk: None,
                        error,
                    });
                }
            }
            chunk += 1;
        }
        outcome
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_BATCH_SIZE,
        }
    }
}
