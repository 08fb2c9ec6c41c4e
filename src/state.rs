use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::rate_limit::LimiterService;

// app's shared state
pub struct AppState {
    pub limiter: Arc<LimiterService>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(limiter: Arc<LimiterService>) -> Self {
        Self {
            limiter,
            started_at: Utc::now(),
        }
    }
}
