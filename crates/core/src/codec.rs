//! Reference codec
//!
//! Converts domain [`Value`]s to the storage form written to the document
//! store and back. The store has no notion of typed references, so an
//! embedded record is written as a reference object:
//!
//! ```text
//! {"_type": "object_reference", "collection": "movies", "pk": "<pk>"}
//! ```
//!
//! In marker mode (`RefMode::Marker`) the object also carries
//! `"__ref__": "movies:<pk>"`, which is the field queries match against.
//! In pk mode queries match the `pk` sub-field directly. The mode must stay
//! fixed for a given store.
//!
//! Reading never resolves references: a stored reference object decodes to
//! `Value::Reference`. Resolution happens in [`ReferenceCodec::resolve`],
//! called when a field is loaded through the backend.

use crate::error::{BridgeError, BridgeResult};
use crate::keys;
use crate::record::{Pk, Record, Reference, PK_FIELD};
use crate::registry::CollectionRegistry;
use crate::value::{Value, ValueMap};
use serde_json::{Map, Number, Value as StoredValue};
use std::sync::Arc;

/// A stored document: one JSON object
pub type StoredDocument = Map<String, StoredValue>;

/// Discriminator field of a reference object
pub const REF_TYPE_FIELD: &str = "_type";
/// Discriminator value of a reference object
pub const REF_TYPE_VALUE: &str = "object_reference";
/// Target collection field of a reference object
pub const REF_COLLECTION_FIELD: &str = "collection";
/// Composite `"<collection>:<pk>"` marker field
pub const REF_MARKER_FIELD: &str = "__ref__";
/// Identity field written by older writers
const LEGACY_ID_FIELD: &str = "_id";

/// How references are encoded for matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefMode {
    /// Queries match `<field>.pk` against the raw pk
    PkBased,
    /// Queries match `<field>.__ref__` against `"<collection>:<pk>"`
    Marker,
}

impl RefMode {
    /// Mode for the `use_pk_based_refs` flag
    pub fn from_flag(use_pk_based_refs: bool) -> Self {
        if use_pk_based_refs {
            RefMode::PkBased
        } else {
            RefMode::Marker
        }
    }

    /// Sub-field of a stored reference that queries target
    pub fn identity_field(self) -> &'static str {
        match self {
            RefMode::PkBased => PK_FIELD,
            RefMode::Marker => REF_MARKER_FIELD,
        }
    }
}

/// Looks up the target of a reference
///
/// Implemented by the backend on top of its `get` path.
pub trait ReferenceResolver {
    /// Load the referenced record
    ///
    /// Fails with `DoesNotExist` if the target is gone.
    fn resolve(&self, reference: &Reference) -> BridgeResult<Record>;
}

/// Domain ⇄ storage value converter
#[derive(Debug, Clone)]
pub struct ReferenceCodec {
    registry: Arc<CollectionRegistry>,
    mode: RefMode,
}

impl ReferenceCodec {
    /// Create a codec over a registry
    pub fn new(registry: Arc<CollectionRegistry>, mode: RefMode) -> Self {
        Self { registry, mode }
    }

    /// Reference encoding mode
    pub fn mode(&self) -> RefMode {
        self.mode
    }

    /// Registry used for record → collection lookups
    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    /// Reference to a record, requiring a pk
    pub fn reference_to(&self, record: &Record) -> BridgeResult<Reference> {
        let collection = self.registry.collection_for(record.doc_type())?;
        let pk = record.pk().ok_or_else(|| {
            BridgeError::invalid_identity(collection, "cannot reference a record without pk")
        })?;
        Ok(Reference::new(collection, pk.clone()))
    }

    /// Encode a domain value into storage form
    pub fn encode(&self, value: &Value) -> BridgeResult<StoredValue> {
        Ok(match value {
            Value::Null => StoredValue::Null,
            Value::Bool(b) => StoredValue::Bool(*b),
            Value::Int(n) => StoredValue::Number((*n).into()),
            Value::Float(x) => Number::from_f64(*x).map_or(StoredValue::Null, StoredValue::Number),
            Value::String(s) => StoredValue::String(s.clone()),
            Value::Array(items) => StoredValue::Array(
                items
                    .iter()
                    .map(|v| self.encode(v))
                    .collect::<BridgeResult<Vec<_>>>()?,
            ),
            Value::Map(m) => StoredValue::Object(self.encode_map(m)?),
            Value::Record(r) => StoredValue::Object(self.reference_object(&self.reference_to(r)?)),
            Value::Reference(r) => StoredValue::Object(self.reference_object(r)),
        })
    }

    /// Encode a map, escaping its keys
    ///
    /// # Errors
    ///
    /// `Serialization` for a key that would read back differently, see
    /// [`keys::round_trips`].
    pub fn encode_map(&self, map: &ValueMap) -> BridgeResult<StoredDocument> {
        let mut out = Map::new();
        for (k, v) in map {
            if !keys::round_trips(k) {
                return Err(BridgeError::serialization(format!(
                    "map key '{}' clashes with the dot escape",
                    k
                )));
            }
            out.insert(k.clone(), self.encode(v)?);
        }
        Ok(keys::encode(out))
    }

    /// Storage object for a reference
    pub fn reference_object(&self, reference: &Reference) -> StoredDocument {
        let mut obj = Map::new();
        obj.insert(REF_TYPE_FIELD.into(), StoredValue::from(REF_TYPE_VALUE));
        obj.insert(
            REF_COLLECTION_FIELD.into(),
            StoredValue::from(reference.collection.as_str()),
        );
        obj.insert(PK_FIELD.into(), StoredValue::from(reference.pk.as_str()));
        if self.mode == RefMode::Marker {
            obj.insert(REF_MARKER_FIELD.into(), StoredValue::from(reference.marker()));
        }
        obj
    }

    /// Reference object as a domain map (used inside query literals)
    pub fn reference_value(&self, reference: &Reference) -> Value {
        Value::Map(
            self.reference_object(reference)
                .into_iter()
                .map(|(k, v)| (k, self.decode_plain(v)))
                .collect(),
        )
    }

    /// Scalar a query compares a reference field against
    ///
    /// The raw pk in pk mode, `"<collection>:<pk>"` in marker mode.
    pub fn reference_literal(&self, value: &Value) -> BridgeResult<Option<Value>> {
        let reference = match value {
            Value::Record(r) => self.reference_to(r)?,
            Value::Reference(r) => r.clone(),
            _ => return Ok(None),
        };
        Ok(Some(match self.mode {
            RefMode::PkBased => Value::String(reference.pk.into_inner()),
            RefMode::Marker => Value::String(reference.marker()),
        }))
    }

    /// Decode a stored value; reference objects become `Value::Reference`
    pub fn decode(&self, stored: &StoredValue) -> Value {
        match stored {
            StoredValue::Object(obj) => match parse_reference(obj) {
                Some(reference) => Value::Reference(reference),
                None => Value::Map(
                    keys::decode(obj.clone())
                        .into_iter()
                        .map(|(k, v)| (k, self.decode(&v)))
                        .collect(),
                ),
            },
            StoredValue::Array(items) => Value::Array(items.iter().map(|v| self.decode(v)).collect()),
            scalar => self.decode_plain(scalar.clone()),
        }
    }

    fn decode_plain(&self, stored: StoredValue) -> Value {
        match stored {
            StoredValue::Null => Value::Null,
            StoredValue::Bool(b) => Value::Bool(b),
            StoredValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            StoredValue::String(s) => Value::String(s),
            StoredValue::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.decode_plain(v)).collect())
            }
            StoredValue::Object(obj) => Value::Map(
                obj.into_iter()
                    .map(|(k, v)| (k, self.decode_plain(v)))
                    .collect(),
            ),
        }
    }

    /// Resolve references in a loaded value
    ///
    /// A `Reference` is replaced by the record it points to; an array has
    /// each reference element resolved (one level). Anything else is
    /// returned unchanged.
    pub fn resolve(&self, value: &Value, resolver: &dyn ReferenceResolver) -> BridgeResult<Value> {
        match value {
            Value::Reference(r) => Ok(Value::from(resolver.resolve(r)?)),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Reference(r) => Ok(Value::from(resolver.resolve(r)?)),
                    other => Ok(other.clone()),
                })
                .collect::<BridgeResult<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    /// Encode a record for storage
    ///
    /// The record must already have a pk; it is written to the `pk` field.
    pub fn encode_document(&self, record: &Record) -> BridgeResult<(Pk, StoredDocument)> {
        let collection = self.registry.collection_for(record.doc_type())?;
        let pk = record
            .pk()
            .cloned()
            .ok_or_else(|| BridgeError::invalid_identity(collection, "record has no pk"))?;
        let mut doc = self.encode_map(record.attributes())?;
        doc.insert(PK_FIELD.into(), StoredValue::from(pk.as_str()));
        Ok((pk, doc))
    }

    /// Decode a stored document from `collection`
    pub fn decode_document(&self, collection: &str, mut doc: StoredDocument) -> BridgeResult<Record> {
        let doc_type = self.registry.doc_type_for(collection)?;
        let pk = match doc.remove(PK_FIELD) {
            Some(StoredValue::String(pk)) => Pk::new(pk),
            Some(other) => {
                return Err(BridgeError::serialization(format!(
                    "document in '{}' has non-string pk {}",
                    collection, other
                )))
            }
            None => {
                return Err(BridgeError::serialization(format!(
                    "document in '{}' has no pk",
                    collection
                )))
            }
        };
        doc.remove(LEGACY_ID_FIELD);
        let attributes = keys::decode(doc)
            .into_iter()
            .map(|(k, v)| {
                let value = self.decode(&v);
                (k, value)
            })
            .collect();
        Ok(Record::from_parts(doc_type, Some(pk), attributes))
    }
}

/// Recognize a stored reference object
fn parse_reference(obj: &StoredDocument) -> Option<Reference> {
    if obj.get(REF_TYPE_FIELD)?.as_str()? != REF_TYPE_VALUE {
        return None;
    }
    let collection = obj.get(REF_COLLECTION_FIELD)?.as_str()?;
    let pk = obj
        .get(PK_FIELD)
        .or_else(|| obj.get(LEGACY_ID_FIELD))?
        .as_str()?;
    Some(Reference::new(collection, pk))
}
