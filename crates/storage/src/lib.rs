//! Storage layer for docbridge
//!
//! This crate provides:
//! - DocumentStore: the contract the adapter needs from an external store
//! - MemoryStore: sharded in-memory implementation (DashMap + FxHashMap)
//! - BatchExecutor: chunked unordered bulk writes
//! - matcher: query evaluation used by the in-memory store

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod matcher;
pub mod memory;
pub mod store;

pub use batch::{BatchExecutor, BatchFailure, BatchOutcome, DEFAULT_BATCH_SIZE};
pub use memory::{MemoryStore, StoreCall};
pub use store::{BulkWriteReport, DocumentStore, WriteFailure, WriteOp};
