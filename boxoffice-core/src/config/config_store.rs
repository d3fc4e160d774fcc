//! Hot-reloadable settings holder.
//!
//! Readers take a short read lock or clone a [`ConfigStore::snapshot`] per
//! operation, so an [`ConfigStore::update`] from the SIGHUP handler applies
//! to the next order or reconciliation attempt.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, RwLockReadGuard};

/// Shared, versioned settings value.
pub struct ConfigStore<T> {
    inner: Arc<Shared<T>>,
}

struct Shared<T> {
    value: RwLock<T>,
    version: AtomicU64,
}

impl<T> ConfigStore<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Shared {
                value: RwLock::new(initial),
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Replace the value once outstanding read guards are released.
    pub async fn update(&self, value: T) {
        let mut guard = self.inner.value.write().await;
        *guard = value;
        self.inner.version.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.value.read().await
    }

    /// Number of updates applied so far.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Relaxed)
    }
}

impl<T: Clone> ConfigStore<T> {
    /// Clone the current value so no lock is held while it is used.
    pub async fn snapshot(&self) -> T {
        self.inner.value.read().await.clone()
    }
}

impl<T> Clone for ConfigStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_update_is_seen_by_every_handle() {
        let store = ConfigStore::new(1u32);
        let writer = store.clone();
        assert_eq!(store.version(), 0);

        writer.update(2).await;

        assert_eq!(*store.read().await, 2);
        assert_eq!(store.snapshot().await, 2);
        assert_eq!(store.version(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached_from_later_updates() {
        let store = ConfigStore::new(String::from("QRIS"));
        let before = store.snapshot().await;
        store.update(String::from("VA")).await;
        assert_eq!(before, "QRIS");
        assert_eq!(*store.read().await, "VA");
        assert_eq!(store.version(), 1);
    }
}
