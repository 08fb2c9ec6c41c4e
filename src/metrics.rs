use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, register_counter, register_gauge};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("gaokao_api_requests_total", "Total number of API requests").unwrap();
    pub static ref RATE_LIMIT_ALLOWED: Counter =
        register_counter!("gaokao_rate_limit_allowed_total", "Requests admitted by the rate limiter").unwrap();
    pub static ref RATE_LIMIT_DENIED: Counter =
        register_counter!("gaokao_rate_limit_denied_total", "Requests denied by the rate limiter").unwrap();
    pub static ref RATE_LIMIT_SATURATED: Counter = register_counter!(
        "gaokao_rate_limit_saturated_total",
        "New keys denied because the limiter was tracking its maximum number of keys"
    )
    .unwrap();
    pub static ref RATE_LIMIT_EVICTED: Counter =
        register_counter!("gaokao_rate_limit_evicted_total", "Idle keys evicted from the limiter").unwrap();
    pub static ref RATE_LIMIT_TRACKED_KEYS: Gauge =
        register_gauge!("gaokao_rate_limit_tracked_keys", "Current number of keys tracked by the limiter").unwrap();
}
