use thiserror::Error;

// Errors raised while building a limiter; `allow` itself never fails
#[derive(Debug, Error)]
pub enum LimiterError {
    #[error("rate must be a positive finite number, got {0}")]
    InvalidRate(f64),

    #[error("burst must be at least 1")]
    InvalidBurst,

    #[error("capacity must be at least 1")]
    InvalidCapacity,

    #[error("{0} must be greater than zero")]
    InvalidDuration(&'static str),

    #[error("no tokio runtime available to run the eviction task")]
    NoRuntime,
}
