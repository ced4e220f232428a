//! Keyed entity locks.
//!
//! Every mutating operation on a pending message, ledger message or template
//! serializes on that entity's id through one of these registries.  Locks
//! are created on first use; [`EntityLocks::purge_unused`] drops entries
//! nobody currently holds so the map does not grow with every id ever seen.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct EntityLocks<K> {
    entries: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> EntityLocks<K> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the lock for `key`, creating it on first use.  The registry
    /// mutex is only held while looking up the entry, never while waiting
    /// for the entity lock itself.
    pub async fn acquire(&self, key: &K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut entries = self.entries.lock().await;
            entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drop lock entries nobody holds or waits on.  Returns how many were
    /// removed.
    pub async fn purge_unused(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        // A guard (or a waiter) keeps a clone of the Arc alive.
        entries.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - entries.len()
    }
}

impl<K: Eq + Hash + Clone> Default for EntityLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = Arc::new(EntityLocks::new());
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(&"entity-1").await;
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                running.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_purge_keeps_held_locks() {
        let locks = EntityLocks::new();

        let guard = locks.acquire(&"held").await;
        let _ = locks.acquire(&"released").await;

        let removed = locks.purge_unused().await;
        assert_eq!(removed, 1);

        drop(guard);
        let removed = locks.purge_unused().await;
        assert_eq!(removed, 1);
    }
}
