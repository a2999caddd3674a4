//! Backend configuration
//!
//! Built in code with the builder methods or read from TOML:
//!
//! ```toml
//! autocommit = false
//! use_pk_based_refs = true
//! batch_size = 500
//! enable_caching = true
//! cache_capacity = 200
//! ```
//!
//! Missing keys take their defaults; unknown keys are rejected.

use docbridge_core::{BridgeError, BridgeResult};
use docbridge_storage::DEFAULT_BATCH_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default capacity of the reference cache
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Options controlling a [`Backend`](crate::Backend)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Apply writes immediately outside `begin`/`commit`
    pub autocommit: bool,
    /// Match references by raw pk instead of `"<collection>:<pk>"` markers
    pub use_pk_based_refs: bool,
    /// Operations per bulk request
    pub batch_size: usize,
    /// Use bulk requests for multi-document writes
    pub enable_batch_operations: bool,
    /// Cache records loaded through references
    pub enable_caching: bool,
    /// Maximum cached records
    pub cache_capacity: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            autocommit: true,
            use_pk_based_refs: false,
            batch_size: DEFAULT_BATCH_SIZE,
            enable_batch_operations: true,
            enable_caching: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl BackendConfig {
    /// Create a config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set autocommit
    pub fn autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    /// Set pk-based reference matching
    pub fn use_pk_based_refs(mut self, enabled: bool) -> Self {
        self.use_pk_based_refs = enabled;
        self
    }

    /// Set the bulk request size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Enable or disable bulk requests
    pub fn enable_batch_operations(mut self, enabled: bool) -> Self {
        self.enable_batch_operations = enabled;
        self
    }

    /// Enable the reference cache with the given capacity
    pub fn caching(mut self, capacity: usize) -> Self {
        self.enable_caching = true;
        self.cache_capacity = capacity;
        self
    }

    /// Check option consistency
    pub fn validate(&self) -> BridgeResult<()> {
        if self.batch_size == 0 {
            return Err(BridgeError::config("batch_size must be at least 1"));
        }
        Ok(())
    }

    /// Parse from a TOML string
    pub fn from_toml_str(input: &str) -> BridgeResult<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| BridgeError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&input)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> BridgeResult<String> {
        toml::to_string(self).map_err(|e| BridgeError::config(e.to_string()))
    }
}
