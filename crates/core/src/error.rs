//! Error types for docbridge
//!
//! A single error enum is shared by every layer: the value codec, the
//! deferred-write buffer, the batch executor and the backend adapter.
//!
//! ## Taxonomy
//!
//! | Category | Variant | Retried? |
//! |----------|---------|----------|
//! | Identity | `InvalidIdentity` | never |
//! | Conflict | `DuplicateKey` | caller decides |
//! | State | `DoesNotExist` | never |
//! | Lookup | `MultipleDocumentsReturned` | never |
//! | Registry | `UnknownDocumentType`, `UnknownCollection` | never |
//! | Transaction | `NotInTransaction`, `TransactionActive`, `PartialCommit` | commit may be retried |
//! | Collaborator | `Storage`, `IndexConflict` | caller decides |

use thiserror::Error;

/// Result type alias used throughout docbridge
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// Errors raised by the adapter core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    /// An operation required a primary key but the record has none
    #[error("invalid identity in '{collection}': {reason}")]
    InvalidIdentity {
        /// Collection the record belongs to
        collection: String,
        /// What was attempted
        reason: String,
    },

    /// A save collided with an existing identity or unique index entry
    #[error("duplicate key in '{collection}' for pk {pk}")]
    DuplicateKey {
        /// Collection written to
        collection: String,
        /// Identity of the rejected document
        pk: String,
    },

    /// The target record does not exist (or is scheduled for deletion)
    #[error("document does not exist in '{collection}'{}: {reason}", fmt_pk(.pk))]
    DoesNotExist {
        /// Collection that was searched
        collection: String,
        /// Identity that was looked up, if any
        pk: Option<String>,
        /// Why the lookup failed
        reason: String,
    },

    /// A single-document lookup matched several documents
    #[error("{count} documents returned from '{collection}' where one was expected")]
    MultipleDocumentsReturned {
        /// Collection that was searched
        collection: String,
        /// Number of matches
        count: usize,
    },

    /// Document type not present in the collection registry
    #[error("unknown document type '{doc_type}'")]
    UnknownDocumentType {
        /// The unregistered type name
        doc_type: String,
    },

    /// Collection name not present in the collection registry
    #[error("unknown collection '{collection}'")]
    UnknownCollection {
        /// The unregistered collection name
        collection: String,
    },

    /// commit/rollback called while writes are applied immediately
    #[error("not in a transaction")]
    NotInTransaction,

    /// begin called while a transaction is already open
    #[error("a transaction is already active")]
    TransactionActive,

    /// Some collections could not be flushed; their pending writes are kept
    #[error("commit incomplete, collections not flushed: {}", .failed.join(", "))]
    PartialCommit {
        /// Collections whose buffered writes remain pending
        failed: Vec<String>,
    },

    /// Query expression could not be parsed or rendered
    #[error("invalid query: {reason}")]
    InvalidQuery {
        /// Description of the problem
        reason: String,
    },

    /// Caller supplied an invalid argument
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the problem
        message: String,
    },

    /// An index exists with incompatible options
    #[error("index conflict on '{collection}': {message}")]
    IndexConflict {
        /// Collection the index belongs to
        collection: String,
        /// Collaborator message
        message: String,
    },

    /// The external store failed to execute a request
    #[error("storage error: {message}")]
    Storage {
        /// Collaborator message
        message: String,
    },

    /// Value could not be converted between domain and storage form
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the problem
        message: String,
    },

    /// Configuration could not be loaded or is inconsistent
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },
}

fn fmt_pk(pk: &Option<String>) -> String {
    match pk {
        Some(pk) => format!(" (pk {})", pk),
        None => String::new(),
    }
}

impl BridgeError {
    /// Missing primary key where one is required
    pub fn invalid_identity(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::InvalidIdentity {
            collection: collection.into(),
            reason: reason.into(),
        }
    }

    /// Duplicate identity on save
    pub fn duplicate_key(collection: impl Into<String>, pk: impl Into<String>) -> Self {
        BridgeError::DuplicateKey {
            collection: collection.into(),
            pk: pk.into(),
        }
    }

    /// Lookup found nothing
    pub fn does_not_exist(
        collection: impl Into<String>,
        pk: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        BridgeError::DoesNotExist {
            collection: collection.into(),
            pk: pk.map(str::to_string),
            reason: reason.into(),
        }
    }

    /// Invalid query expression
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        BridgeError::InvalidQuery {
            reason: reason.into(),
        }
    }

    /// Invalid caller input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        BridgeError::InvalidInput {
            message: message.into(),
        }
    }

    /// Collaborator failure
    pub fn storage(message: impl Into<String>) -> Self {
        BridgeError::Storage {
            message: message.into(),
        }
    }

    /// Conversion failure
    pub fn serialization(message: impl Into<String>) -> Self {
        BridgeError::Serialization {
            message: message.into(),
        }
    }

    /// Configuration failure
    pub fn config(message: impl Into<String>) -> Self {
        BridgeError::Config {
            message: message.into(),
        }
    }

    /// True for conflicts on identity or unique indexes
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, BridgeError::DuplicateKey { .. })
    }

    /// True when the target record is absent
    pub fn is_does_not_exist(&self) -> bool {
        matches!(self, BridgeError::DoesNotExist { .. })
    }

    /// True when the collaborator itself failed
    ///
    /// Storage failures during flush leave the affected collection's
    /// pending writes in place, so a later commit can retry them.
    pub fn is_storage(&self) -> bool {
        matches!(self, BridgeError::Storage { .. })
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::serialization(e.to_string())
    }
}
