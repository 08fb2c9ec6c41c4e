//! Idle bucket reclamation.
//!
//! Two passes share the [`Bucket::is_idle`] predicate:
//!
//! - [`sweep`] runs from the background task. It locks each idle bucket and
//!   keeps it locked until the bucket is out of the map, so a concurrent
//!   `allow` either finishes before the idle check or sees the bucket retired.
//! - [`sweep_locked`] runs inline from `BucketStore::get_or_create` while the
//!   map's write lock is held. It only `try_lock`s buckets and skips busy ones,
//!   which keeps it from waiting on a bucket that a background sweep holds
//!   while that sweep waits on the map lock.
//!
//! [`Bucket::is_idle`]: super::bucket::Bucket::is_idle

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::store::{BucketStore, SharedBucket};
use crate::metrics::{RATE_LIMIT_EVICTED, RATE_LIMIT_TRACKED_KEYS};

// Background pass: bucket locks are taken first, the map lock last
pub fn sweep(store: &BucketStore, now: Instant) -> usize {
    let idle_ttl = store.config().idle_ttl();

    let snapshot: Vec<(String, SharedBucket)> = store
        .entries
        .read()
        .iter()
        .map(|(key, bucket)| (key.clone(), Arc::clone(bucket)))
        .collect();

    let mut pending = Vec::new();
    for (key, bucket) in &snapshot {
        let guard = bucket.lock();
        if guard.is_idle(now, idle_ttl) {
            pending.push((key, bucket, guard));
        }
    }

    if pending.is_empty() {
        return 0;
    }

    let mut entries = store.entries.write();
    let mut evicted = 0;
    for (key, bucket, mut guard) in pending {
        // the slot may have been reclaimed and refilled since the snapshot
        let same = entries
            .get(key.as_str())
            .is_some_and(|current| Arc::ptr_eq(current, bucket));
        if same {
            entries.remove(key.as_str());
            guard.retire();
            evicted += 1;
        }
        drop(guard);
    }
    RATE_LIMIT_TRACKED_KEYS.set(entries.len() as f64);
    evicted
}

// Inline pass for a caller that already holds the map's write lock
pub(crate) fn sweep_locked(
    entries: &mut HashMap<String, SharedBucket>,
    now: Instant,
    idle_ttl: Duration,
) -> usize {
    let before = entries.len();
    entries.retain(|_, bucket| {
        let Some(mut guard) = bucket.try_lock() else {
            return true;
        };
        if guard.is_idle(now, idle_ttl) {
            guard.retire();
            false
        } else {
            true
        }
    });
    before - entries.len()
}

/// Periodically sweeps a store until its cancellation token fires.
pub struct EvictionScheduler {
    store: Arc<BucketStore>,
    period: Duration,
    shutdown: CancellationToken,
}

impl EvictionScheduler {
    pub fn new(store: Arc<BucketStore>, period: Duration, shutdown: CancellationToken) -> Self {
        Self {
            store,
            period,
            shutdown,
        }
    }

    pub async fn run(self) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick fires immediately
        ticker.tick().await;

        info!("Eviction task started (interval: {:?})", self.period);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Eviction task stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let evicted = sweep(&self.store, Instant::now());
                    if evicted > 0 {
                        RATE_LIMIT_EVICTED.inc_by(evicted as f64);
                    }
                    debug!(evicted, remaining = self.store.len(), "eviction pass done");
                }
            }
        }
    }
}
