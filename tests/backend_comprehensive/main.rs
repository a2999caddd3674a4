//! Backend Comprehensive Test Suite
//!
//! Exercises the full adapter through the `docbridge` facade.
//!
//! ## Test Tiers
//!
//! - **Tier 1**: Storage encoding (references, key escaping, projections)
//! - **Tier 2**: Deferred writes (state machine, merging, flush outcomes)
//! - **Tier 3**: Queries (canonicalization against stored documents)
//! - **Tier 4**: Bulk writes and indexes
//! - **Tier 5**: Reference loading, cache and hooks
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test backend_comprehensive
//! ```

// Test modules
mod test_utils;

mod tier1_storage_encoding;
mod tier2_deferred_writes;
mod tier3_query_canonicalization;
mod tier4_bulk_and_indexes;
mod tier5_references_and_hooks;
