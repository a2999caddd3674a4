//! Deferred writes for docbridge
//!
//! Inside a transaction the backend does not touch the store; it stages
//! intents in a [`DeferredWriteBuffer`] and applies them on commit:
//! - intent: per-document state machine and field-level update merging
//! - buffer: per-collection arenas, staging, views and flush
//! - report: what a flush applied, rejected or suppressed

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod intent;
pub mod report;

pub use buffer::{DeferredWriteBuffer, PendingCounts};
pub use intent::{Intent, PendingUpdate};
pub use report::{CollectionFailure, EntryFailure, FlushReport, SuppressedIntent};
