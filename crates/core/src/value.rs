//! Domain values
//!
//! `Value` is what application code puts into a [`Record`]. It is a superset
//! of JSON: besides scalars, arrays and maps it can hold an embedded record
//! (`Value::Record`, written as a reference) and an unresolved reference read
//! back from storage (`Value::Reference`).
//!
//! Dotted paths (`"address.city"`) address nested map entries; see
//! [`Value::get_path`], [`Value::set_path`] and [`Value::remove_path`].

use crate::record::{Record, Reference};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered field map used for record attributes and map values
pub type ValueMap = BTreeMap<String, Value>;

/// A domain value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent / null
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered sequence
    Array(Vec<Value>),
    /// Nested mapping
    Map(ValueMap),
    /// Embedded record, stored as a reference
    Record(Box<Record>),
    /// Reference read back from storage, not yet resolved
    Reference(Reference),
}

impl Value {
    /// Create an empty map value
    pub fn map() -> Self {
        Value::Map(ValueMap::new())
    }

    /// Check for null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for `Record` and `Reference`
    pub fn is_reference_like(&self) -> bool {
        matches!(self, Value::Record(_) | Value::Reference(_))
    }

    /// Borrow as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrow as map
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow as record
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Borrow as unresolved reference
    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Value::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Map(_) => "Map",
            Value::Record(_) => "Record",
            Value::Reference(_) => "Reference",
        }
    }

    /// Look up a dotted path inside nested maps
    ///
    /// Returns None if any segment is missing or a non-map is traversed.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in path.split('.') {
            current = match current {
                Value::Map(m) => m.get(segment)?,
                Value::Record(r) => r.get(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Set a value at a dotted path, creating intermediate maps
    ///
    /// Intermediate non-map values are replaced by maps.
    pub fn set_path(&mut self, path: &str, value: Value) {
        let mut segments = path.split('.').peekable();
        let mut current = self;
        while let Some(segment) = segments.next() {
            if !matches!(current, Value::Map(_)) {
                *current = Value::map();
            }
            let Value::Map(map) = current else {
                unreachable!("replaced by a map above")
            };
            if segments.peek().is_none() {
                map.insert(segment.to_string(), value);
                return;
            }
            current = map.entry(segment.to_string()).or_insert_with(Value::map);
        }
    }

    /// Remove the value at a dotted path, returning it
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        match path.rsplit_once('.') {
            None => match self {
                Value::Map(m) => m.remove(path),
                _ => None,
            },
            Some((parent, leaf)) => match self.get_path_mut(parent)? {
                Value::Map(m) => m.remove(leaf),
                _ => None,
            },
        }
    }

    fn get_path_mut(&mut self, path: &str) -> Option<&mut Value> {
        let mut current = self;
        for segment in path.split('.') {
            current = match current {
                Value::Map(m) => m.get_mut(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Record(r) => match r.pk() {
                Some(pk) => write!(f, "<{} {}>", r.doc_type(), pk),
                None => write!(f, "<{} (new)>", r.doc_type()),
            },
            Value::Reference(r) => write!(f, "<ref {}>", r),
        }
    }
}

// From implementations for common types

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(Box::new(v))
    }
}

impl From<Reference> for Value {
    fn from(v: Reference) -> Self {
        Value::Reference(v)
    }
}

impl From<ValueMap> for Value {
    fn from(v: ValueMap) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
