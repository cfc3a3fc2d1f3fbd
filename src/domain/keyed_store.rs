//! Concurrent keyed storage with per-entry locking.
//!
//! [`KeyedStore`] stores entities in a `HashMap` where each entry is
//! individually protected by a [`tokio::sync::Mutex`]. Holding an entry's
//! lock makes a read-modify-write sequence atomic for that entity while
//! other entities proceed in parallel.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

/// Per-key transactional store.
///
/// Uses a `RwLock<HashMap<...>>` for the outer map and per-entry
/// `Arc<Mutex<V>>` for fine-grained locking.
///
/// # Concurrency
///
/// - Lookups on the outer map run concurrently.
/// - Work on different entries is concurrent.
/// - Work on the same entry is serialized.
#[derive(Debug)]
pub struct KeyedStore<K, V> {
    entries: RwLock<HashMap<K, Arc<Mutex<V>>>>,
}

impl<K, V> KeyedStore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the entry lock for `key`.
    pub async fn get(&self, key: &K) -> Option<Arc<Mutex<V>>> {
        self.entries.read().await.get(key).map(Arc::clone)
    }

    /// Returns the entry lock for `key`, creating it with `init` if absent.
    ///
    /// The second element is `true` if the entry was created.
    pub async fn get_or_insert_with(
        &self,
        key: K,
        init: impl FnOnce() -> V,
    ) -> (Arc<Mutex<V>>, bool) {
        if let Some(existing) = self.get(&key).await {
            return (existing, false);
        }
        let mut map = self.entries.write().await;
        // Another writer may have won the race between the two locks.
        if let Some(existing) = map.get(&key) {
            return (Arc::clone(existing), false);
        }
        let entry = Arc::new(Mutex::new(init()));
        map.insert(key, Arc::clone(&entry));
        (entry, true)
    }

    /// Inserts or replaces the value stored under `key`.
    pub async fn insert(&self, key: K, value: V) {
        self.entries
            .write()
            .await
            .insert(key, Arc::new(Mutex::new(value)));
    }

    /// Returns all keys currently stored.
    pub async fn keys(&self) -> Vec<K> {
        self.entries.read().await.keys().cloned().collect()
    }

    /// Returns the number of entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<K, V> Default for KeyedStore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
