//! HTTP surface: the webhook endpoint, a health probe, and the ad-hoc chat
//! endpoint. Wrong-method requests get 405 from axum's method routing.

mod chat;
mod webhook;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(&state.config.server.webhook_path, post(webhook::receive))
        .route("/healthz", get(healthz))
        .route("/chat", post(chat::chat))
        .with_state(state)
}

async fn healthz() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({"status": "ok"}))
}
