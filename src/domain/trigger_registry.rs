//! In-memory table of reset triggers for one [`TriggerKind`].
//!
//! [`TriggerRegistry`] maps an opaque entity id (guild or user snowflake) to
//! a slot holding a [`TriggerRecord`]. Unregistering clears the slot to an
//! empty placeholder instead of deleting it; every read path skips
//! placeholders.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::trigger::{TriggerKind, TriggerRecord};
use crate::error::HeraldError;

/// Keyed store of trigger records for a single kind.
///
/// # Concurrency
///
/// Writers take the map's write lock for a single insert; readers clone a
/// snapshot under the read lock and release it before any work, so the
/// polling loops never hold the lock across a suspension point.
#[derive(Debug)]
pub struct TriggerRegistry {
    kind: TriggerKind,
    slots: RwLock<HashMap<String, Option<TriggerRecord>>>,
}

impl TriggerRegistry {
    /// Creates an empty registry for `kind`.
    #[must_use]
    pub fn new(kind: TriggerKind) -> Self {
        Self {
            kind,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Kind of record this registry holds.
    #[must_use]
    pub const fn kind(&self) -> TriggerKind {
        self.kind
    }

    /// Stores `record` under `id`, overwriting any previous registration.
    /// Returns the record it replaced.
    ///
    /// # Errors
    ///
    /// Returns [`HeraldError::Internal`] if the record's kind does not
    /// match this registry.
    pub async fn register(
        &self,
        id: &str,
        record: TriggerRecord,
    ) -> Result<Option<TriggerRecord>, HeraldError> {
        if record.kind != self.kind {
            return Err(HeraldError::Internal(format!(
                "{:?} record offered to the {:?} registry",
                record.kind, self.kind
            )));
        }
        let mut slots = self.slots.write().await;
        Ok(slots.insert(id.to_string(), Some(record)).flatten())
    }

    /// Clears the slot for `id` to an empty placeholder.
    ///
    /// Returns `true` if a live record was cleared.
    pub async fn unregister(&self, id: &str) -> bool {
        let mut slots = self.slots.write().await;
        match slots.get_mut(id) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }

    /// Puts a slot back exactly as persisted, placeholder included.
    pub async fn restore(&self, id: String, record: Option<TriggerRecord>) {
        self.slots.write().await.insert(id, record);
    }

    /// Returns a copy of the live record for `id`.
    pub async fn get(&self, id: &str) -> Option<TriggerRecord> {
        self.slots.read().await.get(id).cloned().flatten()
    }

    /// Returns every live record, skipping placeholders.
    pub async fn snapshot(&self) -> Vec<(String, TriggerRecord)> {
        let slots = self.slots.read().await;
        slots
            .iter()
            .filter_map(|(id, slot)| slot.as_ref().map(|record| (id.clone(), record.clone())))
            .collect()
    }

    /// Number of live records.
    pub async fn len(&self) -> usize {
        self.slots.read().await.values().filter(|s| s.is_some()).count()
    }

    /// Returns `true` if no live record is registered.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
