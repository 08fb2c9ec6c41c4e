use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::eviction::{self, EvictionScheduler};
use super::store::BucketStore;
use crate::config::LimiterConfig;
use crate::error::LimiterError;
use crate::metrics::{RATE_LIMIT_ALLOWED, RATE_LIMIT_DENIED, RATE_LIMIT_EVICTED};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LimiterState {
    Created,
    Running,
    Stopped,
}

/// Per-key token bucket limiter.
///
/// Owns one [`BucketStore`] and the background task that evicts idle keys
/// from it. Construct it once at startup and share it behind an `Arc`.
pub struct LimiterService {
    store: Arc<BucketStore>,
    config: LimiterConfig,
    shutdown: CancellationToken,
    state: Mutex<LimiterState>,
}

impl LimiterService {
    /// Builds the limiter and spawns its eviction task on the current tokio
    /// runtime.
    pub fn new(config: LimiterConfig) -> Result<Self, LimiterError> {
        let handle = Handle::try_current().map_err(|_| LimiterError::NoRuntime)?;

        let service = Self {
            store: Arc::new(BucketStore::new(config)),
            config,
            shutdown: CancellationToken::new(),
            state: Mutex::new(LimiterState::Created),
        };

        let scheduler = EvictionScheduler::new(
            Arc::clone(&service.store),
            config.cleanup_interval(),
            service.shutdown.clone(),
        );
        handle.spawn(scheduler.run());
        *service.state.lock() = LimiterState::Running;

        info!(
            rate = config.rate(),
            burst = config.burst(),
            capacity = config.capacity(),
            "Rate limiter started"
        );
        Ok(service)
    }

    pub fn allow(&self, key: &str) -> bool {
        loop {
            let bucket = self.store.get_or_create(key);
            let mut guard = bucket.lock();
            // evicted after we fetched it; look the key up again
            if guard.is_retired() {
                continue;
            }

            let allowed = guard.try_consume(Instant::now(), &self.config);
            if allowed {
                RATE_LIMIT_ALLOWED.inc();
            } else {
                RATE_LIMIT_DENIED.inc();
            }
            return allowed;
        }
    }

    // Cancels the eviction task without waiting for it; safe to call twice
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if *state == LimiterState::Stopped {
            return;
        }
        *state = LimiterState::Stopped;
        self.shutdown.cancel();
        info!("Rate limiter stopped");
    }

    // Runs one eviction pass on the calling thread
    pub fn evict_idle(&self) -> usize {
        let evicted = eviction::sweep(&self.store, Instant::now());
        if evicted > 0 {
            RATE_LIMIT_EVICTED.inc_by(evicted as f64);
        }
        evicted
    }

    pub fn state(&self) -> LimiterState {
        *self.state.lock()
    }

    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }

    pub fn is_tracked(&self, key: &str) -> bool {
        self.store.contains(key)
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }
}

impl Drop for LimiterService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn limiter(rate: f64, burst: u32) -> LimiterService {
        LimiterService::new(LimiterConfig::new(rate, burst).unwrap()).unwrap()
    }

    #[test]
    fn new_without_runtime_fails() {
        let config = LimiterConfig::new(10.0, 5).unwrap();
        assert!(matches!(LimiterService::new(config), Err(LimiterError::NoRuntime)));
    }

    #[tokio::test]
    async fn starts_running() {
        let limiter = limiter(10.0, 20);
        assert_eq!(limiter.state(), LimiterState::Running);
        assert_eq!(limiter.config().burst(), 20);
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn burst_then_refill() {
        let limiter = limiter(10.0, 5);
        let key = "u1";

        for i in 0..5 {
            assert!(limiter.allow(key), "request {} should be allowed", i + 1);
        }
        assert!(!limiter.allow(key), "request 6 should be denied");

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(limiter.allow(key));
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = limiter(10.0, 3);

        for _ in 0..3 {
            assert!(limiter.allow("user_1"));
        }
        assert!(!limiter.allow("user_1"));

        for i in 0..3 {
            assert!(limiter.allow("user_2"), "user_2 request {} should be allowed", i + 1);
        }
    }

    #[tokio::test]
    async fn overflow_keys_are_denied() {
        let config = LimiterConfig::new(10.0, 5)
            .and_then(|c| c.with_capacity(4))
            .unwrap();
        let limiter = LimiterService::new(config).unwrap();

        for i in 0..4 {
            assert!(limiter.allow(&format!("k{}", i)));
        }
        for _ in 0..10 {
            assert!(!limiter.allow("late"));
        }
        assert_eq!(limiter.tracked_keys(), 4);
        assert!(!limiter.is_tracked("late"));
    }

    #[tokio::test]
    async fn idle_key_is_evicted_by_background_pass() {
        let config = LimiterConfig::new(10.0, 2)
            .and_then(|c| c.with_idle_ttl(Duration::from_millis(20)))
            .and_then(|c| c.with_cleanup_interval(Duration::from_millis(30)))
            .unwrap();
        let limiter = LimiterService::new(config).unwrap();

        assert!(limiter.allow("user_1"));
        assert!(limiter.allow("user_1"));
        assert!(!limiter.allow("user_1"));
        assert!(limiter.is_tracked("user_1"));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!limiter.is_tracked("user_1"));

        // comes back as a brand new key
        assert!(limiter.allow("user_1"));
        assert!(limiter.allow("user_1"));
        assert!(!limiter.allow("user_1"));
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_allow_keeps_working() {
        let limiter = limiter(10.0, 2);
        limiter.stop();
        limiter.stop();
        assert_eq!(limiter.state(), LimiterState::Stopped);
        assert!(limiter.shutdown.is_cancelled());

        assert!(limiter.allow("user_1"));
        assert!(limiter.allow("user_1"));
        assert!(!limiter.allow("user_1"));
    }

    #[tokio::test]
    async fn drop_cancels_background_task() {
        let limiter = limiter(10.0, 2);
        let token = limiter.shutdown.clone();
        drop(limiter);
        assert!(token.is_cancelled());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn eviction_racing_allow_never_loses_the_key() {
        let config = LimiterConfig::new(1_000_000_000.0, 1_000)
            .and_then(|c| c.with_idle_ttl(Duration::from_nanos(1)))
            .and_then(|c| c.with_capacity(16))
            .unwrap();
        let limiter = Arc::new(LimiterService::new(config).unwrap());

        let callers: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || {
                    let mut allowed = 0;
                    for _ in 0..5_000 {
                        if limiter.allow("hot") {
                            allowed += 1;
                        }
                    }
                    allowed
                })
            })
            .collect();
        let sweeper = {
            let limiter = Arc::clone(&limiter);
            thread::spawn(move || {
                for _ in 0..2_000 {
                    limiter.evict_idle();
                }
            })
        };

        let allowed: usize = callers.into_iter().map(|h| h.join().unwrap()).sum();
        sweeper.join().unwrap();

        // refill is far faster than the callers, so nothing should be denied
        assert_eq!(allowed, 20_000);
        assert!(limiter.tracked_keys() <= 1);
        assert!(limiter.allow("hot"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_burst_is_never_over_admitted() {
        let limiter = Arc::new(limiter(0.001, 100));
        let callers: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || (0..50).filter(|_| limiter.allow("shared")).count())
            })
            .collect();
        let allowed: usize = callers.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 100);
    }
}
