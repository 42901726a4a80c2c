//! Per-key mutual exclusion.
//!
//! Each key maps to its own async mutex, so pipelines for different candidates never wait on
//! each other while two deliveries for the same candidate run one after the other. Entries
//! live in a moka cache and are dropped after sitting idle; the idle timeout must stay well
//! above the longest time a guard is held (a handful of HTTP calls bounded by the client
//! timeout).

use moka::future::Cache as MokaCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

const DEFAULT_IDLE_SECS: u64 = 3_600;

#[derive(Clone)]
pub struct KeyedLocks {
    locks: MokaCache<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::with_idle_timeout(Duration::from_secs(DEFAULT_IDLE_SECS))
    }

    pub fn with_idle_timeout(idle: Duration) -> Self {
        Self {
            locks: MokaCache::builder().time_to_idle(idle).build(),
        }
    }

    /// Wait for exclusive access to `key`. Access is released when the guard drops.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .get_with(key.to_string(), async { Arc::new(Mutex::new(())) })
            .await;
        mutex.lock_owned().await
    }
}

impl Default for KeyedLocks {
    fn default() -> Self {
        Self::new()
    }
}
