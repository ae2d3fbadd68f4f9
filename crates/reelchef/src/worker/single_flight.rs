use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-key async locks. Entries live only while someone holds or waits on
/// the lock.
#[derive(Default)]
pub struct InFlightLocks {
    locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl InFlightLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other holder of `key` remains.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        self.lock_for(key).lock_owned().await
    }

    /// Keys currently held or waited on.
    pub fn len(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.values().filter(|w| w.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_for(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, weak| weak.strong_count() > 0);
        if let Some(existing) = locks.get(key).and_then(Weak::upgrade) {
            return existing;
        }
        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(key.to_string(), Arc::downgrade(&lock));
        lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_waits() {
        let locks = Arc::new(InFlightLocks::new());
        let first = locks.acquire("https://youtu.be/a").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("https://youtu.be/a").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = InFlightLocks::new();
        let _a = locks.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.acquire("b")).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_released_keys_are_pruned() {
        let locks = InFlightLocks::new();
        drop(locks.acquire("a").await);
        assert!(locks.is_empty());
    }
}
