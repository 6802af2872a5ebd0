//! Persistence layer.
//!
//! Durable state (balances, loan records) goes through the `KvStore`
//! contract: get / put / keys by user id. `MemoryStore` backs tests,
//! `JsonFileStore` backs production with a full-file rewrite per write.
//! `Table` wraps any store with per-user locks and exposes the atomic
//! update-by-key operations the ledgers are built on.

pub mod json_file;
pub mod locks;
pub mod memory;

pub use json_file::JsonFileStore;
pub use locks::{KeyedLocks, Slots};
pub use memory::MemoryStore;

use anyhow::Result;
use std::sync::Arc;
use tracing::error;

use crate::types::{CasinoError, CasinoResult, UserId};

/// Key-value storage keyed by user id.
pub trait KvStore<V>: Send + Sync {
    /// Load the value for `key`, `None` if never written.
    fn get(&self, key: &UserId) -> Result<Option<V>>;

    /// Persist the value for `key`.
    fn put(&self, key: &UserId, value: V) -> Result<()>;

    /// Persist several values as one write where the backend allows it.
    fn put_many(&self, entries: Vec<(UserId, V)>) -> Result<()> {
        for (key, value) in entries {
            self.put(&key, value)?;
        }
        Ok(())
    }

    /// All keys with a stored value.
    fn keys(&self) -> Result<Vec<UserId>>;
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// A store plus per-user locks.
pub struct Table<V> {
    name: &'static str,
    store: Arc<dyn KvStore<V>>,
    locks: KeyedLocks<UserId>,
}

/// Locked access to one key, handed to `Table::locked` callbacks.
pub struct Entry<'a, V> {
    table: &'a Table<V>,
    key: &'a UserId,
}

impl<V> Entry<'_, V> {
    pub fn load(&self) -> CasinoResult<Option<V>> {
        self.table.load(self.key)
    }

    pub fn save(&self, value: V) -> CasinoResult<()> {
        self.table.save(self.key, value)
    }
}

impl<V> Table<V> {
    pub fn new(name: &'static str, store: Arc<dyn KvStore<V>>) -> Self {
        Self {
            name,
            store,
            locks: KeyedLocks::new(),
        }
    }

    /// Read the committed value without taking the key lock.
    pub fn get(&self, key: &UserId) -> CasinoResult<Option<V>> {
        self.load(key)
    }

    pub fn keys(&self) -> CasinoResult<Vec<UserId>> {
        self.store.keys().map_err(|e| self.unavailable("keys", e))
    }

    /// Run `f` inside the critical section for `key`.
    pub fn locked<R>(&self, key: &UserId, f: impl FnOnce(&Entry<'_, V>) -> CasinoResult<R>) -> CasinoResult<R> {
        self.locks.with_lock(key, || f(&Entry { table: self, key }))
    }

    /// Atomic read-modify-write of one key. Nothing is written if `f` fails.
    pub fn update<R>(
        &self,
        key: &UserId,
        f: impl FnOnce(Option<V>) -> CasinoResult<(V, R)>,
    ) -> CasinoResult<R> {
        self.locked(key, |entry| {
            let (next, out) = f(entry.load()?)?;
            entry.save(next)?;
            Ok(out)
        })
    }

    /// Atomic read-modify-write of two distinct keys, written together.
    pub fn update_pair<R>(
        &self,
        a: &UserId,
        b: &UserId,
        f: impl FnOnce(Option<V>, Option<V>) -> CasinoResult<(V, V, R)>,
    ) -> CasinoResult<R> {
        self.locks.with_pair(a, b, || {
            let (next_a, next_b, out) = f(self.load(a)?, self.load(b)?)?;
            self.store
                .put_many(vec![(a.clone(), next_a), (b.clone(), next_b)])
                .map_err(|e| self.unavailable("put_many", e))?;
            Ok(out)
        })
    }

    fn load(&self, key: &UserId) -> CasinoResult<Option<V>> {
        self.store.get(key).map_err(|e| self.unavailable("get", e))
    }

    fn save(&self, key: &UserId, value: V) -> CasinoResult<()> {
        self.store.put(key, value).map_err(|e| self.unavailable("put", e))
    }

    fn unavailable(&self, op: &str, e: anyhow::Error) -> CasinoError {
        error!(table = self.name, op, error = %e, "Storage operation failed");
        CasinoError::StorageUnavailable(format!("{}: {e:#}", self.name))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
