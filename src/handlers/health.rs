use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;

use crate::state::AppState;

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "started_at": state.started_at.to_rfc3339()
    }))
}
