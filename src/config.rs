use std::time::Duration;

use clap::Parser;

use crate::error::LimiterError;

pub const DEFAULT_CAPACITY: usize = 10_000;
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(120);
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(120);

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "gaokao-gateway")]
#[command(about = "HTTP API for the gaokao countdown mini-app")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Tokens refilled per second for each key
    #[arg(long, default_value_t = 10.0)]
    pub rate: f64,

    // Max tokens a key can hold
    #[arg(long, default_value_t = 20)]
    pub burst: u32,

    // Max number of keys tracked at once
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,

    // Seconds a key may stay untouched before it is evicted
    #[arg(long, default_value_t = 120)]
    pub idle_ttl: u64,

    // Seconds between background eviction passes
    #[arg(long, default_value_t = 120)]
    pub cleanup_interval: u64,

    // tracing filter directive, e.g. "info" or "gaokao_gateway=debug"
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn limiter_config(&self) -> Result<LimiterConfig, LimiterError> {
        LimiterConfig::new(self.rate, self.burst)?
            .with_capacity(self.capacity)?
            .with_idle_ttl(Duration::from_secs(self.idle_ttl))?
            .with_cleanup_interval(Duration::from_secs(self.cleanup_interval))
    }
}

/// Immutable limiter settings, shared by every bucket.
///
/// Built through [`LimiterConfig::new`] and the `with_*` setters, each of
/// which rejects values the limiter cannot work with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterConfig {
    rate: f64,
    burst: u32,
    capacity: usize,
    idle_ttl: Duration,
    cleanup_interval: Duration,
}

impl LimiterConfig {
    pub fn new(rate: f64, burst: u32) -> Result<Self, LimiterError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(LimiterError::InvalidRate(rate));
        }
        if burst == 0 {
            return Err(LimiterError::InvalidBurst);
        }
        Ok(Self {
            rate,
            burst,
            capacity: DEFAULT_CAPACITY,
            idle_ttl: DEFAULT_IDLE_TTL,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        })
    }

    pub fn with_capacity(mut self, capacity: usize) -> Result<Self, LimiterError> {
        if capacity == 0 {
            return Err(LimiterError::InvalidCapacity);
        }
        self.capacity = capacity;
        Ok(self)
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Result<Self, LimiterError> {
        if idle_ttl.is_zero() {
            return Err(LimiterError::InvalidDuration("idle_ttl"));
        }
        self.idle_ttl = idle_ttl;
        Ok(self)
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Result<Self, LimiterError> {
        if interval.is_zero() {
            return Err(LimiterError::InvalidDuration("cleanup_interval"));
        }
        self.cleanup_interval = interval;
        Ok(self)
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    pub fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }
}
