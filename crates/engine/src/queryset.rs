//! Query results
//!
//! A [`QuerySet`] holds the stored documents a lookup returned and decodes
//! them into records on access. References inside decoded records stay
//! lazy (`Value::Reference`) until resolved through the backend.

use docbridge_core::{BridgeResult, Record, ReferenceCodec, StoredDocument};

/// Documents returned by a filter
#[derive(Debug, Clone)]
pub struct QuerySet {
    collection: String,
    codec: ReferenceCodec,
    documents: Vec<StoredDocument>,
    projection: Option<Vec<String>>,
}

impl QuerySet {
    pub(crate) fn new(
        collection: String,
        codec: ReferenceCodec,
        documents: Vec<StoredDocument>,
        projection: Option<Vec<String>>,
    ) -> Self {
        Self {
            collection,
            codec,
            documents,
            projection,
        }
    }

    /// Collection the documents came from
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True if nothing matched
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Fields requested by the projection, if any
    ///
    /// Records from a projected query only carry these fields; load the
    /// others with `Backend::load_field`.
    pub fn projection(&self) -> Option<&[String]> {
        self.projection.as_deref()
    }

    /// Stored documents, undecoded
    pub fn raw(&self) -> &[StoredDocument] {
        &self.documents
    }

    /// Take the stored documents
    pub fn into_raw(self) -> Vec<StoredDocument> {
        self.documents
    }

    /// Decode the document at `index`
    pub fn get(&self, index: usize) -> Option<BridgeResult<Record>> {
        self.documents.get(index).map(|doc| self.decode(doc))
    }

    /// Decode the first document
    pub fn first(&self) -> Option<BridgeResult<Record>> {
        self.get(0)
    }

    /// Decode documents one by one
    pub fn iter(&self) -> impl Iterator<Item = BridgeResult<Record>> + '_ {
        self.documents.iter().map(|doc| self.decode(doc))
    }

    /// Decode every document
    pub fn records(&self) -> BridgeResult<Vec<Record>> {
        self.iter().collect()
    }

    fn decode(&self, doc: &StoredDocument) -> BridgeResult<Record> {
        self.codec.decode_document(&self.collection, doc.clone())
    }
}
