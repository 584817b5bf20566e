//! Write guard for read-modify-write cycles on the shared store.
//!
//! The store has no atomic update, so callers that read a document, change it
//! and write it back take this lock first. A caller that finds the lock held
//! sleeps for the retry delay and tries again; waiters are not queued, so only
//! eventual completion is guaranteed, not arrival order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
pub struct StorageLock {
    busy: AtomicBool,
    retry: Duration,
}

/// Releases the lock when dropped.
#[derive(Debug)]
pub struct StorageLockGuard<'a> {
    lock: &'a StorageLock,
}

impl StorageLock {
    pub fn new(retry: Duration) -> Self {
        Self {
            busy: AtomicBool::new(false),
            retry,
        }
    }

    pub fn try_acquire(&self) -> Option<StorageLockGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| StorageLockGuard { lock: self })
    }

    pub async fn acquire(&self) -> StorageLockGuard<'_> {
        loop {
            if let Some(guard) = self.try_acquire() {
                return guard;
            }
            debug!("Storage busy, retrying in {:?}", self.retry);
            tokio::time::sleep(self.retry).await;
        }
    }

    pub fn is_locked(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Default for StorageLock {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl Drop for StorageLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.busy.store(false, Ordering::Release);
    }
}
