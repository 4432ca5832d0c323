//! Ad hoc message endpoint for checking the Telegram side.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::state::AppState;

use super::error_response;

const DEFAULT_TEST_MESSAGE: &str = "🧪 Тестовое сообщение от notion-relay";

#[derive(Debug, Default, Deserialize)]
pub struct TestSendRequest {
    pub message: Option<String>,
}

/// Body is optional; an empty body sends the default test message.
pub async fn test_send(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: TestSendRequest = if body.iter().all(u8::is_ascii_whitespace) {
        TestSendRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(req) => req,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("invalid JSON: {e}")),
        }
    };
    let message = request
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TEST_MESSAGE.to_string());

    info!(chars = message.chars().count(), "sending test message");
    match state.relay.send_text(&message).await {
        Ok(result) => Json(serde_json::json!({
            "status": "sent",
            "duration_ms": result.duration_ms,
        }))
        .into_response(),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}
