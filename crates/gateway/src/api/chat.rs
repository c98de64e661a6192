//! Ad-hoc agent invocation, mostly for smoke-testing a deployment.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    if req.message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ChatResponse {
                success: false,
                message: String::new(),
                error: "message is required".into(),
            }),
        )
            .into_response();
    }

    tracing::info!(message_len = req.message.len(), "chat request");

    let result = state
        .chat
        .chat(
            &state.cancel,
            &state.config.workspace.base,
            &req.message,
            req.system_prompt.as_deref(),
        )
        .await;

    match result {
        Ok(message) => (
            StatusCode::OK,
            Json(ChatResponse {
                success: true,
                message,
                error: String::new(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "chat failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatResponse {
                    success: false,
                    message: String::new(),
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
