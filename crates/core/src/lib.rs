//! Core types for docbridge
//!
//! This crate defines the foundational types shared by every layer:
//! - Value / Record / Pk / Reference: the domain data model
//! - CollectionRegistry: document type ⇄ collection mapping
//! - ReferenceCodec: domain ⇄ storage conversion with typed references
//! - keys: dot escaping for stored map keys
//! - Expr: typed query expressions
//! - BridgeError: the shared error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod keys;
pub mod query;
pub mod record;
pub mod registry;
pub mod value;

pub use codec::{RefMode, ReferenceCodec, ReferenceResolver, StoredDocument};
pub use error::{BridgeError, BridgeResult};
pub use query::{Expr, Operator};
pub use record::{Pk, Record, Reference, PK_FIELD};
pub use registry::{CollectionRegistry, DocTypeSpec, IndexDirection, IndexSpec};
pub use value::{Value, ValueMap};

/// Storage-form value (JSON)
pub use serde_json::Value as StoredValue;
