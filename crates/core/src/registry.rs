//! Collection registry
//!
//! Maps document type names to collection names and back. The registry is
//! built once and handed to the backend at construction; every write path
//! uses it to pick the target collection and every read path uses it to
//! recover the document type of a stored document.
//!
//! A type may also declare secondary indexes, which
//! `Backend::ensure_indexes` creates on the store.

use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sort direction of one indexed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexDirection {
    /// Ascending order
    Ascending,
    /// Descending order
    Descending,
}

/// Index definition passed through to the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Indexed field paths with their direction
    pub fields: Vec<(String, IndexDirection)>,
    /// Reject documents sharing the indexed values
    pub unique: bool,
}

impl IndexSpec {
    /// Ascending, non-unique index over the given fields
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|f| (f.into(), IndexDirection::Ascending))
                .collect(),
            unique: false,
        }
    }

    /// Builder: mark as unique
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Field paths without direction
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(f, _)| f.as_str()).collect()
    }
}

/// Registration entry for one document type
#[derive(Debug, Clone, PartialEq)]
pub struct DocTypeSpec {
    /// Document type name
    pub doc_type: String,
    /// Collection holding documents of this type
    pub collection: String,
    /// Secondary indexes declared for the collection
    pub indexes: Vec<IndexSpec>,
}

impl DocTypeSpec {
    /// Register `doc_type` in `collection`
    pub fn new(doc_type: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            collection: collection.into(),
            indexes: Vec::new(),
        }
    }

    /// Builder: declare a secondary index
    pub fn index(mut self, spec: IndexSpec) -> Self {
        self.indexes.push(spec);
        self
    }
}

/// Bidirectional document type ⇄ collection mapping
#[derive(Debug, Clone, Default)]
pub struct CollectionRegistry {
    by_type: BTreeMap<String, DocTypeSpec>,
    by_collection: BTreeMap<String, String>,
}

impl CollectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document type
    ///
    /// Both the type name and the collection must be unused.
    pub fn register(&mut self, spec: DocTypeSpec) -> BridgeResult<()> {
        validate_collection_name(&spec.collection)?;
        if spec.doc_type.is_empty() {
            return Err(BridgeError::invalid_input("document type must not be empty"));
        }
        if self.by_type.contains_key(&spec.doc_type) {
            return Err(BridgeError::invalid_input(format!(
                "document type '{}' is already registered",
                spec.doc_type
            )));
        }
        if let Some(owner) = self.by_collection.get(&spec.collection) {
            return Err(BridgeError::invalid_input(format!(
                "collection '{}' is already used by '{}'",
                spec.collection, owner
            )));
        }
        self.by_collection
            .insert(spec.collection.clone(), spec.doc_type.clone());
        self.by_type.insert(spec.doc_type.clone(), spec);
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, spec: DocTypeSpec) -> BridgeResult<Self> {
        self.register(spec)?;
        Ok(self)
    }

    /// Collection for a document type
    pub fn collection_for(&self, doc_type: &str) -> BridgeResult<&str> {
        self.by_type
            .get(doc_type)
            .map(|s| s.collection.as_str())
            .ok_or_else(|| BridgeError::UnknownDocumentType {
                doc_type: doc_type.to_string(),
            })
    }

    /// Document type stored in a collection
    pub fn doc_type_for(&self, collection: &str) -> BridgeResult<&str> {
        self.by_collection
            .get(collection)
            .map(String::as_str)
            .ok_or_else(|| BridgeError::UnknownCollection {
                collection: collection.to_string(),
            })
    }

    /// Full registration entry for a document type
    pub fn spec(&self, doc_type: &str) -> BridgeResult<&DocTypeSpec> {
        self.by_type
            .get(doc_type)
            .ok_or_else(|| BridgeError::UnknownDocumentType {
                doc_type: doc_type.to_string(),
            })
    }

    /// Accept either a document type or a collection name, return the collection
    ///
    /// A document type wins over a collection of the same name.
    pub fn resolve_collection<'a>(&'a self, type_or_collection: &'a str) -> BridgeResult<&'a str> {
        if let Some(spec) = self.by_type.get(type_or_collection) {
            return Ok(spec.collection.as_str());
        }
        if self.by_collection.contains_key(type_or_collection) {
            return Ok(type_or_collection);
        }
        Err(BridgeError::UnknownDocumentType {
            doc_type: type_or_collection.to_string(),
        })
    }

    /// All registered types, ordered by type name
    pub fn specs(&self) -> impl Iterator<Item = &DocTypeSpec> {
        self.by_type.values()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

/// Validate a collection name
///
/// Names must be non-empty and must not contain `.` or `$`.
pub fn validate_collection_name(name: &str) -> BridgeResult<()> {
    if name.is_empty() {
        return Err(BridgeError::invalid_input("collection name must not be empty"));
    }
    if name.contains('.') || name.contains('$') {
        return Err(BridgeError::invalid_input(format!(
            "collection name '{}' must not contain '.' or '$'",
            name
        )));
    }
    Ok(())
}
