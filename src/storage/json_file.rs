//! JSON-file `KvStore`.
//!
//! The whole map is kept in memory and the file is rewritten on every
//! write (via a temp file and rename, so a crash leaves either the old or
//! the new file). A failed write leaves the in-memory copy untouched.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use super::locks::lock;
use super::KvStore;
use crate::types::UserId;

pub struct JsonFileStore<V> {
    path: PathBuf,
    entries: Mutex<BTreeMap<UserId, V>>,
}

impl<V: Serialize + DeserializeOwned + Clone> JsonFileStore<V> {
    /// Open the store at `path`, starting empty if the file doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store {}", path.display()))?;
            let entries: BTreeMap<UserId, V> = serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse store {}", path.display()))?;
            info!(path = %path.display(), entries = entries.len(), "Store loaded from disk");
            entries
        } else {
            info!(path = %path.display(), "No store file found, starting empty");
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<UserId, V>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(entries).context("Failed to serialise store")?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), entries = entries.len(), "Store flushed");
        Ok(())
    }
}

impl<V> KvStore<V> for JsonFileStore<V>
where
    V: Serialize + DeserializeOwned + Clone + Send,
{
    fn get(&self, key: &UserId) -> Result<Option<V>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn put(&self, key: &UserId, value: V) -> Result<()> {
        self.put_many(vec![(key.clone(), value)])
    }

    fn put_many(&self, batch: Vec<(UserId, V)>) -> Result<()> {
        let mut entries = lock(&self.entries);
        let mut next = entries.clone();
        next.extend(batch);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<UserId>> {
        Ok(lock(&self.entries).keys().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
