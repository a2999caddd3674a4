//! Records, primary keys and references
//!
//! A [`Record`] is an application document: a registered document type, an
//! optional primary key and an ordered attribute map. A record without a pk
//! is "new"; the pk is assigned the first time the record is persisted and
//! never changes afterwards.

use crate::value::{Value, ValueMap};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the primary key field in stored documents
pub const PK_FIELD: &str = "pk";

/// Primary key of a record
///
/// Generated keys are 32 lowercase hex characters (UUIDv4, no hyphens).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pk(String);

impl Pk {
    /// Wrap an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Pk(id.into())
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Pk(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Borrow the identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the identifier
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Pk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Pk {
    fn from(s: &str) -> Self {
        Pk(s.to_string())
    }
}

impl From<String> for Pk {
    fn from(s: String) -> Self {
        Pk(s)
    }
}

impl AsRef<str> for Pk {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Pointer from one record's field to another record
///
/// Produced when a stored reference object is read back. Resolution is
/// deferred until the field is loaded through the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Collection holding the target
    pub collection: String,
    /// Primary key of the target
    pub pk: Pk,
}

impl Reference {
    /// Create a reference
    pub fn new(collection: impl Into<String>, pk: impl Into<Pk>) -> Self {
        Self {
            collection: collection.into(),
            pk: pk.into(),
        }
    }

    /// Composite marker string `"<collection>:<pk>"`
    pub fn marker(&self) -> String {
        format!("{}:{}", self.collection, self.pk)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.collection, self.pk)
    }
}

/// An application document
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    doc_type: String,
    pk: Option<Pk>,
    attributes: ValueMap,
}

impl Record {
    /// Create a new record (no pk yet)
    pub fn new(doc_type: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            pk: None,
            attributes: ValueMap::new(),
        }
    }

    /// Create a record with a known pk
    pub fn with_pk(doc_type: impl Into<String>, pk: impl Into<Pk>) -> Self {
        Self {
            doc_type: doc_type.into(),
            pk: Some(pk.into()),
            attributes: ValueMap::new(),
        }
    }

    /// Create a record from existing parts
    pub fn from_parts(doc_type: impl Into<String>, pk: Option<Pk>, attributes: ValueMap) -> Self {
        Self {
            doc_type: doc_type.into(),
            pk,
            attributes,
        }
    }

    /// Builder: set an attribute
    pub fn attr(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(field.into(), value.into());
        self
    }

    /// Registered document type
    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    /// Primary key, if assigned
    pub fn pk(&self) -> Option<&Pk> {
        self.pk.as_ref()
    }

    /// True if the record has never been assigned a pk
    pub fn is_new(&self) -> bool {
        self.pk.is_none()
    }

    /// Return the pk, generating one first if absent
    ///
    /// An existing pk is never replaced.
    pub fn ensure_pk(&mut self) -> &Pk {
        self.pk.get_or_insert_with(Pk::generate)
    }

    /// Attribute map
    pub fn attributes(&self) -> &ValueMap {
        &self.attributes
    }

    /// Mutable attribute map
    pub fn attributes_mut(&mut self) -> &mut ValueMap {
        &mut self.attributes
    }

    /// Top-level attribute
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attributes.get(field)
    }

    /// Set a top-level attribute
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(field.into(), value.into());
    }

    /// Remove a top-level attribute
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.attributes.remove(field)
    }

    /// Value at a dotted path (`"address.city"`)
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let value = self.attributes.get(head)?;
        match rest {
            Some(rest) => value.get_path(rest),
            None => Some(value),
        }
    }

    /// Set a value at a dotted path, creating intermediate maps
    pub fn set_path(&mut self, path: &str, value: Value) {
        match path.split_once('.') {
            None => {
                self.attributes.insert(path.to_string(), value);
            }
            Some((head, rest)) => {
                let slot = self
                    .attributes
                    .entry(head.to_string())
                    .or_insert_with(Value::map);
                slot.set_path(rest, value);
            }
        }
    }

    /// Remove the value at a dotted path
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        match path.split_once('.') {
            None => self.attributes.remove(path),
            Some((head, rest)) => self.attributes.get_mut(head)?.remove_path(rest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_pk_shape() {
        let pk = Pk::generate();
        assert_eq!(pk.as_str().len(), 32);
        assert!(pk.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(pk, Pk::generate());
    }

    #[test]
    fn test_ensure_pk_never_reassigns() {
        let mut r = Record::new("Movie");
        assert!(r.is_new());
        let first = r.ensure_pk().clone();
        let second = r.ensure_pk().clone();
        assert_eq!(first, second);
        assert!(!r.is_new());
    }

    #[test]
    fn test_record_paths() {
        let mut r = Record::new("Actor").attr("name", "Ann");
        r.set_path("address.city", Value::from("Oslo"));
        assert_eq!(r.get_path("address.city"), Some(&Value::from("Oslo")));
        assert_eq!(r.get_path("name"), Some(&Value::from("Ann")));
        assert_eq!(r.remove_path("address.city"), Some(Value::from("Oslo")));
        assert!(r.get_path("address.city").is_none());
    }

    #[test]
    fn test_reference_marker() {
        let r = Reference::new("movies", "42");
        assert_eq!(r.marker(), "movies:42");
        assert_eq!(r.to_string(), "movies:42");
    }
}
