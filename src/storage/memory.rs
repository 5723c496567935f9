use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{ProfileId, StateStore, StorageError, StorageKey};

/// Process-local store. State is lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<(String, String), String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held for one profile.
    pub fn len_for(&self, profile: &ProfileId) -> usize {
        let map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        map.keys().filter(|(p, _)| p == profile.as_str()).count()
    }

    fn slot(profile: &ProfileId, key: &StorageKey) -> (String, String) {
        (profile.as_str().to_string(), key.name())
    }
}

impl StateStore for MemoryStore {
    async fn get(&self, profile: &ProfileId, key: &StorageKey) -> Result<Option<String>, StorageError> {
        let map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(&Self::slot(profile, key)).cloned())
    }

    async fn set(&self, profile: &ProfileId, key: &StorageKey, value: &str) -> Result<(), StorageError> {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(Self::slot(profile, key), value.to_string());
        Ok(())
    }

    async fn remove(&self, profile: &ProfileId, key: &StorageKey) -> Result<(), StorageError> {
        let mut map = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(&Self::slot(profile, key));
        Ok(())
    }
}
