//! Per-key serialization primitives.
//!
//! `KeyedLocks` hands out one mutex per key so that read-modify-write
//! sequences for the same user serialize while different users proceed in
//! parallel. `Slots` is the same idea for transient in-memory state
//! (game sessions, bets, payment requests) where the value lives inside the
//! per-key mutex itself.
//!
//! Both maps only hold entries that are in use: a key's handle is dropped
//! again once no caller holds it, and an empty slot goes with it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Keyed locks
// ---------------------------------------------------------------------------

pub struct KeyedLocks<K> {
    handles: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Clone + Eq + Hash + Ord> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, key: &K) -> Arc<Mutex<()>> {
        // The registry lock is only held while looking up the handle.
        let mut handles = lock(&self.handles);
        handles.entry(key.clone()).or_default().clone()
    }

    /// Forget `key` once the caller's handle is the only one outside the map.
    fn release(&self, key: &K, handle: Arc<Mutex<()>>) {
        let mut handles = lock(&self.handles);
        // One reference in the map, one in `handle`.
        if Arc::strong_count(&handle) == 2 {
            handles.remove(key);
        }
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<R>(&self, key: &K, f: impl FnOnce() -> R) -> R {
        let handle = self.handle(key);
        let out = {
            let _guard = lock(&handle);
            f()
        };
        self.release(key, handle);
        out
    }

    /// Run `f` while holding the locks for two distinct keys.
    ///
    /// Locks are always taken in key order, so two pair operations over the
    /// same users can never deadlock. Callers must pass distinct keys.
    pub fn with_pair<R>(&self, a: &K, b: &K, f: impl FnOnce() -> R) -> R {
        debug_assert!(a != b, "pair lock requires distinct keys");
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        let first_handle = self.handle(first);
        let second_handle = self.handle(second);
        let out = {
            let _first = lock(&first_handle);
            let _second = lock(&second_handle);
            f()
        };
        self.release(first, first_handle);
        self.release(second, second_handle);
        out
    }

    /// Number of keys with a live handle.
    pub fn len(&self) -> usize {
        lock(&self.handles).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// Transient per-key state, one mutex per key.
pub struct Slots<K, T> {
    slots: Mutex<HashMap<K, Arc<Mutex<Option<T>>>>>,
}

impl<K, T> Default for Slots<K, T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Clone + Eq + Hash, T> Slots<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with exclusive access to the slot for `key`.
    pub fn with_slot<R>(&self, key: &K, f: impl FnOnce(&mut Option<T>) -> R) -> R {
        let slot = {
            let mut slots = lock(&self.slots);
            slots.entry(key.clone()).or_insert_with(|| Arc::new(Mutex::new(None))).clone()
        };
        let out = {
            let mut value = lock(&slot);
            f(&mut value)
        };
        self.release(key, slot);
        out
    }

    /// Drop the map entry for `key` if it is empty and nobody else holds it.
    fn release(&self, key: &K, slot: Arc<Mutex<Option<T>>>) {
        let mut slots = lock(&self.slots);
        // Any other holder took its clone under the registry lock, so a
        // count of two means the slot's mutex is free.
        if Arc::strong_count(&slot) == 2 && lock(&slot).is_none() {
            slots.remove(key);
        }
    }

    /// Drop every idle slot whose value fails `keep`. Slots in use by another
    /// caller are left alone. Returns how many values were dropped.
    pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) -> usize {
        let mut slots = lock(&self.slots);
        let before = slots.len();
        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match lock(slot).as_ref() {
                Some(value) => keep(value),
                None => false,
            }
        });
        before - slots.len()
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        let slots: Vec<_> = lock(&self.slots).values().cloned().collect();
        slots.iter().filter(|slot| lock(slot).is_some()).count()
    }

    /// Number of keys in the map, occupied or not.
    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
