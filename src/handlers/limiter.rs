use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::rate_limit::LimiterState;
use crate::state::AppState;

#[derive(Serialize)]
pub struct LimiterStatus {
    pub state: LimiterState,
    pub tracked_keys: usize,
    pub capacity: usize,
    pub rate: f64,
    pub burst: u32,
}

// Snapshot of the limiter, itself served behind the limiter
pub async fn limiter_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let limiter = &state.limiter;
    let config = limiter.config();
    let status = LimiterStatus {
        state: limiter.state(),
        tracked_keys: limiter.tracked_keys(),
        capacity: config.capacity(),
        rate: config.rate(),
        burst: config.burst(),
    };
    Json(serde_json::json!({
        "success": true,
        "data": status
    }))
}
