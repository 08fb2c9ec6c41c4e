use std::sync::Arc;

use axum::{Router, middleware::from_fn_with_state, routing::get};

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod rate_limit;
pub mod state;

use handlers::{health_handler, limiter_handler, metrics_handler};
use state::AppState;

// /health and /metrics are open; everything under /api goes through the limiter
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/limiter", get(limiter_handler))
        .route_layer(from_fn_with_state(
            Arc::clone(&state.limiter),
            middleware::rate_limit,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api", api)
        .with_state(state)
}
