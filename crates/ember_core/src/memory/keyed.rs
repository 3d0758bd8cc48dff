//! # Keyed Container
//!
//! Content-addressed counterpart of the slot container: handles are keyed by
//! a 64-bit content hash instead of a dense index.
//!
//! The table is sized with `reserve` before any concurrent access starts and
//! is never resized by two threads at once.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A hash-keyed store of native handles with byte usage accounting.
#[derive(Debug)]
pub struct KeyedContainer<H> {
    /// key -> (handle, usage in bytes)
    entries: RwLock<HashMap<u64, (H, u64)>>,
    /// Sum of all entry usages, in bytes.
    memory_usage: AtomicU64,
}

impl<H: Copy> KeyedContainer<H> {
    /// Creates a container with room for `capacity` keys reserved up front.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(capacity)),
            memory_usage: AtomicU64::new(0),
        }
    }

    /// Inserts a handle, returning the handle previously stored under `key`.
    pub fn insert(&self, key: u64, handle: H, usage: u64) -> Option<H> {
        let previous = self.entries.write().insert(key, (handle, usage));
        self.memory_usage.fetch_add(usage, Ordering::AcqRel);

        previous.map(|(old, old_usage)| {
            self.memory_usage.fetch_sub(old_usage, Ordering::AcqRel);
            old
        })
    }

    /// Reserves room for `additional` more keys.
    pub fn reserve(&self, additional: usize) {
        self.entries.write().reserve(additional);
    }

    /// Returns the handle stored under `key`.
    #[inline]
    #[must_use]
    pub fn get(&self, key: u64) -> Option<H> {
        self.entries.read().get(&key).map(|&(handle, _)| handle)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains(&self, key: u64) -> bool {
        self.entries.read().contains_key(&key)
    }

    /// Removes `key`, subtracting its usage. The native handle is returned,
    /// not destroyed.
    pub fn remove(&self, key: u64) -> Option<H> {
        let (handle, usage) = self.entries.write().remove(&key)?;
        self.memory_usage.fetch_sub(usage, Ordering::AcqRel);
        Some(handle)
    }

    /// Number of stored handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Summed usage of all entries, in bytes.
    #[inline]
    #[must_use]
    pub fn memory_usage(&self) -> u64 {
        self.memory_usage.load(Ordering::Acquire)
    }

    /// Removes every entry and returns the handles. Capacity is kept.
    pub fn drain(&self) -> Vec<(u64, H)> {
        let drained = self
            .entries
            .write()
            .drain()
            .map(|(key, (handle, _))| (key, handle))
            .collect();
        self.memory_usage.store(0, Ordering::Release);
        drained
    }
}
