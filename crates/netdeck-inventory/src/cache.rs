//! Time-bounded cache for inventory queries
//!
//! Entries are keyed by a canonical query signature so that the same filter
//! expressed in a different order hits the same slot.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug)]
struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

#[derive(Debug)]
pub struct DeviceCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> DeviceCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value for `signature` if it is younger than the TTL
    ///
    /// A stale entry is dropped.
    pub async fn get(&self, signature: &str) -> Option<V> {
        let mut entries = self.entries.lock().await;
        match entries.get(signature) {
            Some(e) if e.fetched_at.elapsed() < self.ttl => Some(e.value.clone()),
            Some(_) => {
                entries.remove(signature);
                None
            }
            None => None,
        }
    }

    /// Store `value`, sweeping out every expired entry
    pub async fn put(&self, signature: impl Into<String>, value: V) {
        let mut entries = self.entries.lock().await;
        let ttl = self.ttl;
        entries.retain(|_, e| e.fetched_at.elapsed() < ttl);
        entries.insert(
            signature.into(),
            Entry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn invalidate(&self, signature: &str) {
        self.entries.lock().await.remove(signature);
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

impl<V: Clone> Default for DeviceCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
