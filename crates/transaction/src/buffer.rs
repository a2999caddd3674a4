//! Deferred-write buffer
//!
//! Holds the pending intents of one transaction until they are flushed to a
//! [`DocumentStore`]. Intents live in a per-collection arena: a vector of
//! entries in staging order plus an FxHashMap from pk to slot. Entries are
//! never removed individually; a collection's arena is dropped as a whole
//! once it has been flushed.
//!
//! # Flush order
//!
//! Collections are flushed in name order. Within a collection:
//! 1. all pending deletes, as chunked bulk deletes
//! 2. all pending saves, as chunked bulk upserts
//! 3. one `update_one` per pending update
//!
//! A delete always wins: saves and updates for a deleted pk are never sent,
//! they are reported as suppressed instead.
//!
//! # Thread Safety
//!
//! The buffer has no internal locking. It is owned by one backend and every
//! mutation takes `&mut self`.

use crate::intent::{Intent, PendingUpdate};
use crate::report::{CollectionFailure, EntryFailure, FlushReport, SuppressedIntent};
use docbridge_core::{BridgeError, BridgeResult, Pk, StoredDocument};
use docbridge_storage::{BatchExecutor, BatchOutcome, DocumentStore};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct Entry {
    pk: Pk,
    intent: Intent,
}

/// Arena of intents for one collection
#[derive(Debug, Clone, Default)]
struct CollectionBuffer {
    entries: Vec<Entry>,
    index: FxHashMap<Pk, usize>,
}

impl CollectionBuffer {
    fn get(&self, pk: &Pk) -> Option<&Intent> {
        self.index.get(pk).map(|&slot| &self.entries[slot].intent)
    }

    fn get_mut(&mut self, pk: &Pk) -> Option<&mut Intent> {
        match self.index.get(pk) {
            Some(&slot) => Some(&mut self.entries[slot].intent),
            None => None,
        }
    }

    fn insert(&mut self, pk: Pk, intent: Intent) {
        self.index.insert(pk.clone(), self.entries.len());
        self.entries.push(Entry { pk, intent });
    }
}

/// Counts of pending intents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingCounts {
    /// Documents to write (including saves followed by an update)
    pub saves: usize,
    /// Documents to update (including saves followed by an update)
    pub updates: usize,
    /// Documents to delete
    pub deletes: usize,
}

impl PendingCounts {
    /// Sum of all pending operations
    pub fn total(&self) -> usize {
        self.saves + self.updates + self.deletes
    }
}

/// Pending writes of one transaction
#[derive(Debug, Clone, Default)]
pub struct DeferredWriteBuffer {
    collections: BTreeMap<String, CollectionBuffer>,
}

impl DeferredWriteBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Staging
    // ========================================================================

    /// Stage a full document write
    ///
    /// A save staged after a delete of the same pk is kept as the delete's
    /// suppressed save; the delete still wins at flush.
    ///
    /// # Arguments
    ///
    /// * `collection` - Target collection
    /// * `pk` - Document identity
    /// * `document` - Encoded document, replacing any earlier staged save
    pub fn stage_save(&mut self, collection: &str, pk: Pk, document: StoredDocument) {
        let buffer = self.collections.entry(collection.to_string()).or_default();
        let Some(intent) = buffer.get_mut(&pk) else {
            debug!(collection = %collection, pk = %pk, "staged save");
            buffer.insert(pk, Intent::Save { document });
            return;
        };

        let next = match take(intent) {
            Intent::Save { .. } => Intent::Save { document },
            Intent::Update(update) => Intent::SaveThenUpdate { document, update },
            Intent::SaveThenUpdate { update, .. } => Intent::SaveThenUpdate { document, update },
            Intent::Delete {
                suppressed_update, ..
            } => {
                warn!(collection = %collection, pk = %pk, "save staged after delete will be suppressed");
                Intent::Delete {
                    suppressed_save: Some(document),
                    suppressed_update,
                }
            }
        };
        *intent = next;
    }

    /// Stage a deletion
    ///
    /// Removes any pending save for the pk. A pending update is kept as the
    /// delete's suppressed update and reported at flush.
    ///
    /// # Errors
    ///
    /// `InvalidIdentity` if `pk` is `None`.
    pub fn stage_delete(&mut self, collection: &str, pk: Option<Pk>) -> BridgeResult<()> {
        let pk = pk.ok_or_else(|| {
            BridgeError::invalid_identity(collection, "cannot delete a record without pk")
        })?;
        let buffer = self.collections.entry(collection.to_string()).or_default();
        debug!(collection = %collection, pk = %pk, "staged delete");

        let Some(intent) = buffer.get_mut(&pk) else {
            buffer.insert(
                pk,
                Intent::Delete {
                    suppressed_save: None,
                    suppressed_update: None,
                },
            );
            return Ok(());
        };

        let next = match take(intent) {
            Intent::Save { .. } => Intent::Delete {
                suppressed_save: None,
                suppressed_update: None,
            },
            Intent::Update(update) | Intent::SaveThenUpdate { update, .. } => Intent::Delete {
                suppressed_save: None,
                suppressed_update: Some(update),
            },
            already @ Intent::Delete { .. } => already,
        };
        *intent = next;
        Ok(())
    }

    /// Stage a field-level update
    ///
    /// Merges with any pending update for the pk; see
    /// [`PendingUpdate::merge`].
    ///
    /// # Errors
    ///
    /// `DoesNotExist` if the pk is staged for deletion. The buffer is left
    /// unchanged.
    pub fn stage_update(
        &mut self,
        collection: &str,
        pk: Pk,
        set: StoredDocument,
        unset: impl IntoIterator<Item = String>,
    ) -> BridgeResult<()> {
        if self.state_of(collection, &pk).map_or(false, Intent::is_delete) {
            return Err(BridgeError::does_not_exist(
                collection,
                Some(pk.as_str()),
                "document is staged for deletion",
            ));
        }

        let buffer = self.collections.entry(collection.to_string()).or_default();
        debug!(collection = %collection, pk = %pk, "staged update");
        let Some(intent) = buffer.get_mut(&pk) else {
            buffer.insert(pk, Intent::Update(PendingUpdate::new(set, unset)));
            return Ok(());
        };

        let next = match take(intent) {
            Intent::Update(mut update) => {
                update.merge(set, unset);
                Intent::Update(update)
            }
            Intent::SaveThenUpdate {
                document,
                mut update,
            } => {
                update.merge(set, unset);
                Intent::SaveThenUpdate { document, update }
            }
            Intent::Save { document } => Intent::SaveThenUpdate {
                document,
                update: PendingUpdate::new(set, unset),
            },
            already @ Intent::Delete { .. } => already,
        };
        *intent = next;
        Ok(())
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Current intent for a pk
    pub fn state_of(&self, collection: &str, pk: &Pk) -> Option<&Intent> {
        self.collections.get(collection)?.get(pk)
    }

    /// Documents that will be written for a collection, in staging order
    pub fn pending_saves(&self, collection: &str) -> Vec<(&Pk, &StoredDocument)> {
        self.entries(collection)
            .filter_map(|e| e.intent.document().map(|d| (&e.pk, d)))
            .collect()
    }

    /// Pks that will be deleted from a collection, in staging order
    pub fn pending_deletes(&self, collection: &str) -> Vec<&Pk> {
        self.entries(collection)
            .filter(|e| e.intent.is_delete())
            .map(|e| &e.pk)
            .collect()
    }

    /// Update that will be applied to a pk
    pub fn pending_update(&self, collection: &str, pk: &Pk) -> Option<&PendingUpdate> {
        self.state_of(collection, pk)?.update()
    }

    /// Pending operation counts across all collections
    pub fn pending_operations(&self) -> PendingCounts {
        let mut counts = PendingCounts::default();
        for entry in self.collections.values().flat_map(|b| b.entries.iter()) {
            match &entry.intent {
                Intent::Save { .. } => counts.saves += 1,
                Intent::Update(_) => counts.updates += 1,
                Intent::SaveThenUpdate { .. } => {
                    counts.saves += 1;
                    counts.updates += 1;
                }
                Intent::Delete { .. } => counts.deletes += 1,
            }
        }
        counts
    }

    /// Every staged `(collection, pk)`, in flush order
    pub fn staged_keys(&self) -> Vec<(&str, &Pk)> {
        self.collections
            .iter()
            .flat_map(|(name, b)| b.entries.iter().map(move |e| (name.as_str(), &e.pk)))
            .collect()
    }

    /// Collections with pending intents, in flush order
    pub fn collections(&self) -> Vec<&str> {
        self.collections.keys().map(String::as_str).collect()
    }

    /// True if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.collections.values().all(|b| b.entries.is_empty())
    }

    /// Discard every pending intent
    pub fn clear(&mut self) {
        self.collections.clear();
    }

    fn entries<'a>(&'a self, collection: &str) -> impl Iterator<Item = &'a Entry> + 'a {
        self.collections
            .get(collection)
            .into_iter()
            .flat_map(|b| b.entries.iter())
    }

    // ========================================================================
    // Flush
    // ========================================================================

    /// Apply every pending intent to the store
    ///
    /// Collections that flush without a transport failure are cleared, even
    /// if single entries were rejected. A collection whose request fails as a
    /// whole keeps all of its intents so the flush can be repeated; the
    /// remaining collections are still flushed.
    pub fn flush<S>(&mut self, store: &S, batch: &BatchExecutor) -> FlushReport
    where
        S: DocumentStore + ?Sized,
    {
        let mut report = FlushReport::default();
        let names: Vec<String> = self.collections.keys().cloned().collect();

        for name in names {
            let Some(buffer) = self.collections.get(&name) else {
                continue;
            };
            match flush_collection(store, batch, &name, buffer) {
                Ok(collection_report) => {
                    self.collections.remove(&name);
                    report.merge(collection_report);
                    report.flushed.push(name);
                }
                Err(error) => {
                    warn!(collection = %name, error = %error, "flush failed, keeping buffered intents");
                    report.failed_collections.push(CollectionFailure {
                        collection: name,
                        error,
                    });
                }
            }
        }

        debug!(
            flushed = report.flushed.len(),
            failed = report.failed_collections.len(),
            saved = report.saved,
            deleted = report.deleted,
            updated = report.updated,
            "flush complete"
        );
        report
    }
}

/// Placeholder swap so an intent can be moved out of its slot
fn take(intent: &mut Intent) -> Intent {
    std::mem::replace(
        intent,
        Intent::Delete {
            suppressed_save: None,
            suppressed_update: None,
        },
    )
}

fn flush_collection<S>(
    store: &S,
    batch: &BatchExecutor,
    collection: &str,
    buffer: &CollectionBuffer,
) -> BridgeResult<FlushReport>
where
    S: DocumentStore + ?Sized,
{
    let mut report = FlushReport::default();

    let mut deletes = Vec::new();
    for entry in &buffer.entries {
        if let Intent::Delete {
            suppressed_save,
            suppressed_update,
        } = &entry.intent
        {
            deletes.push(entry.pk.clone());
            if suppressed_save.is_some() {
                report.suppressed.push(SuppressedIntent::Save {
                    collection: collection.to_string(),
                    pk: entry.pk.clone(),
                });
            }
            if let Some(update) = suppressed_update {
                report.suppressed.push(SuppressedIntent::Update {
                    collection: collection.to_string(),
                    pk: entry.pk.clone(),
                    update: update.clone(),
                });
            }
        }
    }
    if !deletes.is_empty() {
        let outcome = batch.delete(store, collection, &deletes);
        let applied = collect_entry_failures(collection, outcome, &mut report)?;
        report.deleted = applied;
    }

    let saves: Vec<(Pk, StoredDocument)> = buffer
        .entries
        .iter()
        .filter_map(|e| e.intent.document().map(|d| (e.pk.clone(), d.clone())))
        .collect();
    if !saves.is_empty() {
        let outcome = batch.save_documents(store, collection, saves);
        let applied = collect_entry_failures(collection, outcome, &mut report)?;
        report.saved = applied;
    }

    for entry in &buffer.entries {
        let Some(update) = entry.intent.update().filter(|u| !u.is_empty()) else {
            continue;
        };
        match store.update_one(collection, &entry.pk, update.set(), &update.unset_list()) {
            Ok(true) => report.updated += 1,
            Ok(false) => report.entry_failures.push(EntryFailure {
                collection: collection.to_string(),
                pk: entry.pk.clone(),
                error: BridgeError::does_not_exist(
                    collection,
                    Some(entry.pk.as_str()),
                    "no document to update",
                ),
            }),
            Err(error) if error.is_storage() => return Err(error),
            Err(error) => report.entry_failures.push(EntryFailure {
                collection: collection.to_string(),
                pk: entry.pk.clone(),
                error,
            }),
        }
    }

    Ok(report)
}

/// Move entry failures into the report, returning the number applied
///
/// A chunk rejected as a whole fails the collection.
fn collect_entry_failures(
    collection: &str,
    outcome: BatchOutcome,
    report: &mut FlushReport,
) -> BridgeResult<usize> {
    if let Some(transport) = outcome.failures.iter().find(|f| f.is_transport()) {
        return Err(transport.error.clone());
    }
    let applied = outcome.identities.len() - outcome.failures.len();
    for failure in outcome.failures {
        if let Some(pk) = failure.pk {
            report.entry_failures.push(EntryFailure {
                collection: collection.to_string(),
                pk,
                error: failure.error,
            });
        }
    }
    Ok(applied)
}
