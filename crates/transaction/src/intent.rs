//! Pending write intents
//!
//! Every `(collection, pk)` touched inside a transaction carries exactly
//! one [`Intent`]. Staging calls move it through a small state machine:
//!
//! ```text
//!            save            update             delete
//! (none) --> Save    (none) --> Update   any --> Delete
//! Save   --> Save    Save   --> SaveThenUpdate
//! Update --> SaveThenUpdate   Update --> Update (merged)
//! Delete --> Delete (save kept as suppressed)
//!            Delete --update--> error, unchanged
//! ```

use docbridge_core::{StoredDocument, StoredValue};
use std::collections::BTreeSet;

/// Accumulated field-level update for one document
///
/// `set` and `unset` never share a field path: every instruction removes
/// its field from the opposite side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingUpdate {
    set: StoredDocument,
    unset: BTreeSet<String>,
}

impl PendingUpdate {
    /// Create an update from one instruction pair
    ///
    /// A field named in both `set` and `unset` ends up unset.
    pub fn new(set: StoredDocument, unset: impl IntoIterator<Item = String>) -> Self {
        let mut update = Self::default();
        update.merge(set, unset);
        update
    }

    /// Fold a later instruction pair into this update
    ///
    /// The most recent instruction for a field wins; `set` is applied before
    /// `unset` within one call.
    pub fn merge(&mut self, set: StoredDocument, unset: impl IntoIterator<Item = String>) {
        for (field, value) in set {
            self.unset.remove(&field);
            self.set.insert(field, value);
        }
        for field in unset {
            self.set.remove(&field);
            self.unset.insert(field);
        }
    }

    /// Fields to set, with their stored-form values
    pub fn set(&self) -> &StoredDocument {
        &self.set
    }

    /// Value staged for one field
    pub fn set_value(&self, field: &str) -> Option<&StoredValue> {
        self.set.get(field)
    }

    /// Fields to remove
    pub fn unset(&self) -> &BTreeSet<String> {
        &self.unset
    }

    /// Unset fields as a list, in sorted order
    pub fn unset_list(&self) -> Vec<String> {
        self.unset.iter().cloned().collect()
    }

    /// True if the update carries no instruction
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }
}

/// Staged intent for one `(collection, pk)`
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Full document write
    Save {
        /// Encoded document
        document: StoredDocument,
    },
    /// Field-level update of a document already in the store
    Update(PendingUpdate),
    /// Full write followed by a field-level update
    SaveThenUpdate {
        /// Encoded document
        document: StoredDocument,
        /// Update applied after the write
        update: PendingUpdate,
    },
    /// Deletion; wins over any other staged intent
    Delete {
        /// Save staged after the delete; never applied
        suppressed_save: Option<StoredDocument>,
        /// Update pending when the delete arrived; never applied
        suppressed_update: Option<PendingUpdate>,
    },
}

impl Intent {
    /// Short state name, for logs and assertions
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::Save { .. } => "save",
            Intent::Update(_) => "update",
            Intent::SaveThenUpdate { .. } => "save_then_update",
            Intent::Delete { .. } => "delete",
        }
    }

    /// Document that will be written at flush, if any
    pub fn document(&self) -> Option<&StoredDocument> {
        match self {
            Intent::Save { document } | Intent::SaveThenUpdate { document, .. } => Some(document),
            _ => None,
        }
    }

    /// Update that will be applied at flush, if any
    pub fn update(&self) -> Option<&PendingUpdate> {
        match self {
            Intent::Update(update) | Intent::SaveThenUpdate { update, .. } => Some(update),
            _ => None,
        }
    }

    /// True for the delete state
    pub fn is_delete(&self) -> bool {
        matches!(self, Intent::Delete { .. })
    }
}
