//! Write hooks
//!
//! Hooks run synchronously before a write is applied or staged, in the order
//! they were registered. An error from any hook aborts the call before the
//! store or the buffer is touched.

use docbridge_core::{BridgeResult, Record, ValueMap};

/// Callbacks invoked around backend writes
///
/// Every method defaults to doing nothing.
pub trait BackendHook: Send + Sync {
    /// Called before a record is saved; may modify the record
    fn before_save(&self, _record: &mut Record) -> BridgeResult<()> {
        Ok(())
    }

    /// Called before a record is deleted
    fn before_delete(&self, _record: &Record) -> BridgeResult<()> {
        Ok(())
    }

    /// Called before an update with the resolved set values and unset paths
    fn before_update(
        &self,
        _record: &Record,
        _set: &ValueMap,
        _unset: &[String],
    ) -> BridgeResult<()> {
        Ok(())
    }
}
