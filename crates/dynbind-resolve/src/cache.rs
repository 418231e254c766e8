//! Compute-once caches.
//!
//! `ComputeOnceMap` runs a fallible computation at most once per key, even
//! when several threads ask for the same key at the same time: each key owns
//! a `OnceCell` slot, and only one initializer runs per slot while the others
//! wait for its result. A failed computation leaves the slot empty, so the
//! next caller computes again. Entries are never evicted.

use std::hash::Hash;
use std::sync::Arc;

use dynbind_reflect::Ty;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::specialize::Specialization;

pub struct ComputeOnceMap<K, V> {
    slots: Mutex<FxHashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for ComputeOnceMap<K, V> {
    fn default() -> Self {
        ComputeOnceMap {
            slots: Mutex::new(FxHashMap::default()),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> ComputeOnceMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value for `key`, running `compute` if there is none yet.
    ///
    /// The map lock is held only to find the slot; `compute` runs outside it,
    /// so it may use other caches freely. It must not ask for the same key.
    /// A failed computation removes its slot again.
    pub fn get_or_create<E>(
        &self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        let slot = self.slots.lock().entry(key.clone()).or_default().clone();
        let mut computed = false;
        let result = slot.get_or_try_init(|| {
            computed = true;
            compute()
        });
        match result {
            Ok(value) => {
                let value = value.clone();
                if computed {
                    // A failing racer may have dropped the slot meanwhile.
                    self.slots.lock().entry(key).or_insert(slot);
                }
                Ok(value)
            }
            Err(err) => {
                let mut slots = self.slots.lock();
                let stale = slots
                    .get(&key)
                    .is_some_and(|current| Arc::ptr_eq(current, &slot) && current.get().is_none());
                if stale {
                    slots.remove(&key);
                }
                Err(err)
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.slots.lock().get(key).and_then(|slot| slot.get().cloned())
    }

    /// Number of keys holding a value.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered tuple of concrete types identifying one specialization: the
/// mapped argument types for calls, the supplied types for explicit
/// instantiation.
pub type SpecializationKey = Vec<Ty>;

pub type SpecializationCache = ComputeOnceMap<SpecializationKey, Specialization>;
