//! Per-entity version assignment
//!
//! Writers on the same entity key are serialized through a key lock; writers
//! on different keys never contend. The store's unique constraint on
//! `(entity_type, id, version)` backs this up across processes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{AuditError, AuditResult};
use crate::models::EntityRef;
use crate::storage::{RecordStore, StoreError};

type KeyLock = Arc<Mutex<()>>;

/// Hands out per-entity locks and computes the next version
#[derive(Debug, Default)]
pub struct VersionSequencer {
    locks: Mutex<HashMap<EntityRef, KeyLock>>,
}

/// Holds a key lock's slot in the map; prunes it when the last holder leaves
struct Lease<'a> {
    sequencer: &'a VersionSequencer,
    key: &'a EntityRef,
    lock: KeyLock,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        let mut locks = self
            .sequencer
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here: nobody else is waiting
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(self.key);
        }
    }
}

impl VersionSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `body` while holding the lock for `key`
    pub fn with_key_lock<T>(&self, key: &EntityRef, body: impl FnOnce() -> T) -> AuditResult<T> {
        let lease = self.lease(key)?;
        // Guards `()`; a poisoned lock holds no state
        let _guard = lease.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(body())
    }

    /// `max(existing versions) + 1`, starting at 1
    pub fn next_version(store: &dyn RecordStore, key: &EntityRef) -> Result<u32, StoreError> {
        Ok(store.max_version(key)?.unwrap_or(0) + 1)
    }

    /// Number of keys currently holding a lock slot
    pub fn active_keys(&self) -> usize {
        self.locks
            .lock()
            .map(|locks| locks.len())
            .unwrap_or_default()
    }

    fn lease<'a>(&'a self, key: &'a EntityRef) -> AuditResult<Lease<'a>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| AuditError::Persistence(format!("Failed to acquire key lock map: {}", e)))?;
        let lock = Arc::clone(locks.entry(key.clone()).or_default());
        Ok(Lease {
            sequencer: self,
            key,
            lock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_lock_slots_pruned() {
        let sequencer = VersionSequencer::new();
        let key = EntityRef::new("Widget", 1);

        let value = sequencer
            .with_key_lock(&key, || sequencer.active_keys())
            .unwrap();
        assert_eq!(value, 1);
        assert_eq!(sequencer.active_keys(), 0);
    }

    #[test]
    fn test_same_key_is_serialized() {
        let sequencer = VersionSequencer::new();
        let key = EntityRef::new("Widget", 1);
        let inside = AtomicUsize::new(0);
        let overlap = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    sequencer
                        .with_key_lock(&key, || {
                            if inside.fetch_add(1, Ordering::SeqCst) > 0 {
                                overlap.fetch_add(1, Ordering::SeqCst);
                            }
                            std::thread::yield_now();
                            inside.fetch_sub(1, Ordering::SeqCst);
                        })
                        .unwrap();
                });
            }
        });

        assert_eq!(overlap.load(Ordering::SeqCst), 0);
        assert_eq!(sequencer.active_keys(), 0);
    }

    #[test]
    fn test_panic_in_body_releases_lock() {
        let sequencer = VersionSequencer::new();
        let key = EntityRef::new("Widget", 1);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            sequencer.with_key_lock(&key, || panic!("boom")).unwrap();
        }));
        assert!(result.is_err());

        assert_eq!(sequencer.with_key_lock(&key, || 7).unwrap(), 7);
    }
}
