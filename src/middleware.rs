use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

use crate::metrics::REQUEST_TOTAL;
use crate::rate_limit::LimiterService;

// Authenticated Telegram user, put on the request by the identity layer
// that runs in front of the limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub i64);

// Limiter key: the user when known, the peer address otherwise
pub fn request_key(req: &Request) -> String {
    if let Some(UserId(id)) = req.extensions().get::<UserId>() {
        return format!("user_{}", id);
    }
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    "unknown".to_string()
}

pub async fn rate_limit(
    State(limiter): State<Arc<LimiterService>>,
    req: Request,
    next: Next,
) -> Response {
    REQUEST_TOTAL.inc();

    let key = request_key(&req);
    if !limiter.allow(&key) {
        warn!(key = %key, "rate limit exceeded");
        return too_many_requests();
    }

    next.run(req).await
}

fn too_many_requests() -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(json!({
            "success": false,
            "error": "Too many requests, please try again later"
        })),
    )
        .into_response()
}
