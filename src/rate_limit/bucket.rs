use std::time::{Duration, Instant};

use crate::config::LimiterConfig;

// Token bucket state for a single key
#[derive(Debug)]
pub struct Bucket {
    tokens: f64,
    last_refill: Instant,
    // set when the bucket is removed from the store
    retired: bool,
}

impl Bucket {
    // New key: starts with a full burst
    pub fn full(burst: u32, now: Instant) -> Self {
        Self {
            tokens: f64::from(burst),
            last_refill: now,
            retired: false,
        }
    }

    // Fail-closed placeholder handed out when the store is saturated
    pub fn empty(now: Instant) -> Self {
        Self {
            tokens: 0.0,
            last_refill: now,
            retired: false,
        }
    }

    /// Refills for the time elapsed since the last call, then takes one token.
    ///
    /// A `now` earlier than the last refill counts as zero elapsed time and
    /// leaves `last_refill` where it was, so a clock step backwards never
    /// credits tokens.
    pub fn try_consume(&mut self, now: Instant, config: &LimiterConfig) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill);
        if now > self.last_refill {
            self.last_refill = now;
        }

        let burst = f64::from(config.burst());
        self.tokens = (self.tokens + elapsed.as_secs_f64() * config.rate()).min(burst);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn is_idle(&self, now: Instant, idle_ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_refill) > idle_ttl
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn last_refill(&self) -> Instant {
        self.last_refill
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    pub(crate) fn retire(&mut self) {
        self.retired = true;
    }
}
