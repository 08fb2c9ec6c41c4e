use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use super::bucket::Bucket;
use super::eviction;
use crate::config::LimiterConfig;
use crate::metrics::{RATE_LIMIT_EVICTED, RATE_LIMIT_SATURATED, RATE_LIMIT_TRACKED_KEYS};

pub type SharedBucket = Arc<Mutex<Bucket>>;

/// Key → bucket map with a hard bound on how many keys it tracks.
///
/// The map lock only guards the map's shape. Token state lives behind each
/// bucket's own mutex, so callers lock a bucket after the map lock is gone.
pub struct BucketStore {
    pub(super) entries: RwLock<HashMap<String, SharedBucket>>,
    config: LimiterConfig,
}

impl BucketStore {
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn get_or_create(&self, key: &str) -> SharedBucket {
        self.get_or_create_at(key, Instant::now())
    }

    // Returns the key's bucket, inserting a full one on first sight.
    // When the store is full and nothing idle can be reclaimed, the caller
    // gets an empty bucket that is never inserted.
    pub(crate) fn get_or_create_at(&self, key: &str, now: Instant) -> SharedBucket {
        if let Some(bucket) = self.entries.read().get(key) {
            return Arc::clone(bucket);
        }

        let mut entries = self.entries.write();
        // someone may have inserted it between the two locks
        if let Some(bucket) = entries.get(key) {
            return Arc::clone(bucket);
        }

        let capacity = self.config.capacity();
        if entries.len() >= capacity {
            let evicted = eviction::sweep_locked(&mut entries, now, self.config.idle_ttl());
            if evicted > 0 {
                RATE_LIMIT_EVICTED.inc_by(evicted as f64);
                RATE_LIMIT_TRACKED_KEYS.set(entries.len() as f64);
                debug!(evicted, remaining = entries.len(), "store full, evicted idle keys");
            }
        }

        if entries.len() >= capacity {
            RATE_LIMIT_SATURATED.inc();
            warn!(capacity, "rate limit store saturated, denying new key");
            return Arc::new(Mutex::new(Bucket::empty(now)));
        }

        let bucket = Arc::new(Mutex::new(Bucket::full(self.config.burst(), now)));
        entries.insert(key.to_string(), Arc::clone(&bucket));
        RATE_LIMIT_TRACKED_KEYS.set(entries.len() as f64);
        bucket
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }
}
