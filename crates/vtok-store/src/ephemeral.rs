use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;
use vtok_types::Attributes;

use crate::error::{StoreError, StoreResult};
use crate::key::StoreKey;
use crate::traits::ObjectStore;

/// In-memory object store.
///
/// Behaves exactly like a durable store for the lifetime of the process and
/// loses everything at exit. Used when a backing location cannot be opened,
/// and in tests.
pub struct EphemeralObjectStore {
    entries: RwLock<HashMap<StoreKey, Attributes>>,
}

impl EphemeralObjectStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.write().expect("lock poisoned").clear();
    }
}

impl Default for EphemeralObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for EphemeralObjectStore {
    fn load_all(&self) -> StoreResult<Vec<(StoreKey, Attributes)>> {
        let map = self.entries.read().expect("lock poisoned");
        let mut entries: Vec<(StoreKey, Attributes)> = map
            .iter()
            .map(|(key, attrs)| (*key, attrs.clone()))
            .collect();
        entries.sort_by_key(|(key, _)| *key);
        Ok(entries)
    }

    fn insert(&self, attributes: &Attributes) -> StoreResult<StoreKey> {
        let key = StoreKey::new();
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(key, attributes.clone());
        debug!(key = %key.short_id(), "ephemeral insert");
        Ok(key)
    }

    fn update(&self, key: &StoreKey, attributes: &Attributes) -> StoreResult<()> {
        let mut map = self.entries.write().expect("lock poisoned");
        match map.get_mut(key) {
            Some(slot) => {
                *slot = attributes.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(*key)),
        }
    }

    fn delete(&self, key: &StoreKey) -> StoreResult<()> {
        self.entries
            .write()
            .expect("lock poisoned")
            .remove(key)
            .map(|_| ())
            .ok_or(StoreError::NotFound(*key))
    }

    fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    fn is_durable(&self) -> bool {
        false
    }
}
