mod health;
mod limiter;
mod metrics;

pub use health::health_handler;
pub use limiter::limiter_handler;
pub use metrics::metrics_handler;
