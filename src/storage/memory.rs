//! In-memory `KvStore`, used by tests and ephemeral deployments.

use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use super::KvStore;
use crate::types::UserId;

pub struct MemoryStore<V> {
    entries: RwLock<BTreeMap<UserId, V>>,
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing values.
    pub fn with_entries(entries: impl IntoIterator<Item = (UserId, V)>) -> Self {
        Self {
            entries: RwLock::new(entries.into_iter().collect()),
        }
    }
}

impl<V: Clone + Send + Sync> KvStore<V> for MemoryStore<V> {
    fn get(&self, key: &UserId) -> Result<Option<V>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &UserId, value: V) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.clone(), value);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<UserId>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.keys().cloned().collect())
    }
}
