//! Reference-counted per-key async mutex map.
//!
//! Entries exist only while someone holds or waits for the key, so the map
//! never grows beyond the number of keys currently in flight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Namespaced lock key. Emails and subscription ids never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    Email(String),
    Subscription(String),
}

struct Entry {
    mutex: Arc<AsyncMutex<()>>,
    holders: usize,
}

/// Map of key to async mutex, shared by every transaction of one store.
#[derive(Default)]
pub struct KeyLocks {
    entries: Mutex<HashMap<LockKey, Entry>>,
}

/// Exclusive hold on one key. Releases on drop.
pub struct KeyGuard {
    // Field order matters: unlock before deregistering.
    _guard: OwnedMutexGuard<()>,
    _registration: Registration,
}

struct Registration {
    locks: Arc<KeyLocks>,
    key: LockKey,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut entries = self.locks.entries();
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.holders -= 1;
            if entry.holders == 0 {
                entries.remove(&self.key);
            }
        }
    }
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<LockKey, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Waits up to `timeout` for exclusive access to `key`.
    ///
    /// Returns `None` when the wait timed out. The waiter is deregistered in
    /// every case, including when the calling future is dropped mid-wait.
    pub async fn acquire(self: &Arc<Self>, key: LockKey, timeout: Duration) -> Option<KeyGuard> {
        let (mutex, registration) = {
            let mut entries = self.entries();
            let entry = entries.entry(key.clone()).or_insert_with(|| Entry {
                mutex: Arc::new(AsyncMutex::new(())),
                holders: 0,
            });
            entry.holders += 1;
            (
                Arc::clone(&entry.mutex),
                Registration {
                    locks: Arc::clone(self),
                    key,
                },
            )
        };

        let guard = tokio::time::timeout(timeout, mutex.lock_owned()).await.ok()?;
        Some(KeyGuard {
            _guard: guard,
            _registration: registration,
        })
    }

    /// Number of keys currently held or awaited.
    pub fn active_keys(&self) -> usize {
        self.entries().len()
    }
}
