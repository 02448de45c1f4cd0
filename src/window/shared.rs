use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use crate::window::{BoxedWindowStore, StoreStrategy, WindowStore};

/// Single-writer/multi-reader handle around the active [`WindowStore`](super::WindowStore).
#[derive(Debug)]
pub struct SharedWindow {
    store: RwLock<BoxedWindowStore>,
}

impl SharedWindow {
    pub fn new(store: BoxedWindowStore) -> Self {
        Self { store: RwLock::new(store) }
    }

    // a panicking writer leaves the counts usable, so poisoning is ignored
    fn read(&self) -> RwLockReadGuard<'_, BoxedWindowStore> {
        self.store.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BoxedWindowStore> {
        self.store.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record(&self, slot_time: u64, delta: u64) {
        self.write().record(slot_time, delta);
    }

    pub fn total(&self, now: u64) -> u64 {
        self.read().total(now)
    }

    pub fn compact(&self, now: u64) {
        self.write().compact(now);
    }

    pub fn window_seconds(&self) -> u64 {
        self.read().window_seconds()
    }

    pub fn strategy(&self) -> StoreStrategy {
        self.read().strategy()
    }

    pub fn describe(&self) -> String {
        self.read().describe()
    }

    /// Copy of the store taken under the read lock, for serialization off the lock.
    pub fn clone_store(&self) -> BoxedWindowStore {
        let store = self.read();
        BoxedWindowStore::clone(&store)
    }
}
