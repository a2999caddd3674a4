//! Flush outcome
//!
//! Accumulates everything a flush could not apply. A flush is clean only if
//! [`FlushReport::is_clean`] returns true.

use crate::intent::PendingUpdate;
use docbridge_core::{BridgeError, Pk};

/// A collection whose submission failed as a whole
///
/// Its buffered intents are kept for the next flush.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionFailure {
    /// Collection name
    pub collection: String,
    /// Transport-level cause
    pub error: BridgeError,
}

/// One buffered entry the store rejected
///
/// Entry failures are not retried; the entry is dropped from the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryFailure {
    /// Collection name
    pub collection: String,
    /// Rejected document
    pub pk: Pk,
    /// Cause reported by the store
    pub error: BridgeError,
}

/// A staged intent that a delete overrode
#[derive(Debug, Clone, PartialEq)]
pub enum SuppressedIntent {
    /// Save staged after a delete of the same pk
    Save {
        /// Collection name
        collection: String,
        /// Document identity
        pk: Pk,
    },
    /// Update pending when a delete of the same pk was staged
    Update {
        /// Collection name
        collection: String,
        /// Document identity
        pk: Pk,
        /// The update that was dropped
        update: PendingUpdate,
    },
}

impl SuppressedIntent {
    /// Identity of the suppressed intent
    pub fn pk(&self) -> &Pk {
        match self {
            SuppressedIntent::Save { pk, .. } | SuppressedIntent::Update { pk, .. } => pk,
        }
    }
}

/// Result of flushing a deferred-write buffer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    /// Collections flushed and cleared
    pub flushed: Vec<String>,
    /// Collections left buffered after a transport failure
    pub failed_collections: Vec<CollectionFailure>,
    /// Entries rejected by the store
    pub entry_failures: Vec<EntryFailure>,
    /// Intents dropped because a delete won
    pub suppressed: Vec<SuppressedIntent>,
    /// Documents deleted
    pub deleted: usize,
    /// Documents written
    pub saved: usize,
    /// Updates applied
    pub updated: usize,
}

impl FlushReport {
    /// True if every entry was applied and nothing was suppressed
    pub fn is_clean(&self) -> bool {
        self.failed_collections.is_empty()
            && self.entry_failures.is_empty()
            && self.suppressed.is_empty()
    }

    /// True if some collection must be flushed again
    pub fn has_pending_collections(&self) -> bool {
        !self.failed_collections.is_empty()
    }

    /// Names of the collections that failed at transport level
    pub fn failed_collection_names(&self) -> Vec<String> {
        self.failed_collections
            .iter()
            .map(|f| f.collection.clone())
            .collect()
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: FlushReport) {
        self.flushed.extend(other.flushed);
        self.failed_collections.extend(other.failed_collections);
        self.entry_failures.extend(other.entry_failures);
        self.suppressed.extend(other.suppressed);
        self.deleted += other.deleted;
        self.saved += other.saved;
        self.updated += other.updated;
    }
}
