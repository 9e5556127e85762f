//! Per-entity lock manager.
//!
//! Serializes transitions on the same `(kind, id)` pair while letting
//! transitions on different operations run in parallel. Each key maps to a
//! `tokio::sync::Mutex` that is created on first use and evicted once the
//! last holder or waiter is gone, so the registry only holds keys that are
//! currently contended.

use std::future::Future;
use std::sync::Arc;

use common::{OperationId, OperationKind};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Key a transition is serialized on.
pub type LockKey = (OperationKind, OperationId);

/// Registry of per-operation mutexes.
///
/// Constructed once at startup and shared through an `Arc`.
#[derive(Debug, Default)]
pub struct EntityLocks {
    locks: DashMap<LockKey, Arc<Mutex<()>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the lock for `key` is free and takes it.
    ///
    /// The lock is held until the returned guard is dropped. There is no
    /// timeout: the wait only ends when the current holder releases. If the
    /// returned future is dropped mid-wait, the key is still released.
    pub async fn acquire(&self, key: LockKey) -> EntityGuard<'_> {
        let reservation = Reservation { locks: self, key };
        // Clone under the shard lock so eviction can see this waiter.
        let mutex = self.locks.entry(key).or_default().value().clone();
        let guard = mutex.lock_owned().await;

        EntityGuard {
            _guard: guard,
            reservation,
        }
    }

    /// Runs `f` while holding the lock for `key`.
    pub async fn with_lock<F, Fut, T>(&self, key: LockKey, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.acquire(key).await;
        f().await
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn release(&self, key: &LockKey) {
        // Only the registry's own reference left: nobody holds or waits.
        self.locks
            .remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// Interest in a key, from the start of the wait until the hold ends.
#[derive(Debug)]
struct Reservation<'a> {
    locks: &'a EntityLocks,
    key: LockKey,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.key);
    }
}

/// Exclusive hold on one operation key.
#[derive(Debug)]
pub struct EntityGuard<'a> {
    // Declared first: the mutex guard must drop before the key is released.
    _guard: OwnedMutexGuard<()>,
    reservation: Reservation<'a>,
}

impl EntityGuard<'_> {
    pub fn key(&self) -> LockKey {
        self.reservation.key
    }
}
