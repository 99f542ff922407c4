use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// A registry of per-key async mutexes.
///
/// Confirmations for the same transaction reference must be serialized so that the
/// resolve-then-commit sequence reads a status that is still current when the write lands.
/// Different references never contend with each other.
///
/// The registry only grows. Entries are a pointer and a mutex each, and the set of live
/// references in one process stays small enough that eviction is not worth the bookkeeping.
#[derive(Clone, Default)]
pub struct KeyedLock {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `key`, creating it on first use. The guard is owned, so it can be held
    /// across await points.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut map = self.inner.lock().await;
            Arc::clone(map.entry(key.to_string()).or_default())
        };
        entry.lock_owned().await
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::KeyedLock;

    #[tokio::test]
    async fn same_key_serializes() {
        let locks = KeyedLock::new();
        let in_section = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let in_section = in_section.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("tx-001").await;
                assert_eq!(in_section.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
                in_section.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
    }

    #[tokio::test]
    async fn different_keys_do_not_contend() {
        let locks = KeyedLock::new();
        let _a = locks.acquire("tx-001").await;
        // would deadlock if keys shared a mutex
        let _b = locks.acquire("tx-002").await;
    }
}
