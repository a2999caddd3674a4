//! Backend adapter for docbridge
//!
//! This crate ties the other layers together:
//! - backend: the [`Backend`] applications call (writes, transactions,
//!   queries, reference loading, indexes)
//! - canonical: query rewriting for reference-valued predicates
//! - cache: bounded cache of records loaded through references
//! - config: [`BackendConfig`], built in code or read from TOML
//! - hooks: callbacks run before writes
//! - queryset: lazily decoded query results

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod cache;
pub mod canonical;
pub mod config;
pub mod hooks;
pub mod queryset;

pub use backend::{Backend, SaveOutcome, SetFields};
pub use cache::BoundedCache;
pub use canonical::{FieldAliasEncoder, QueryCanonicalizer, QueryEncoder};
pub use config::{BackendConfig, DEFAULT_CACHE_CAPACITY};
pub use hooks::BackendHook;
pub use queryset::QuerySet;
