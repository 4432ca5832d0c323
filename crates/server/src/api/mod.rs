//! HTTP endpoint handlers.
//!
//! Each sub-module owns one responsibility area; shared response helpers
//! live here.

mod health;
mod send;
mod webhook;


use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

// ── Shared types ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

pub(crate) fn ok_response() -> Response {
    Json(serde_json::json!({"status": "ok"})).into_response()
}

// ── Re-exports ───────────────────────────────────────────────────

pub use health::{health, index};
pub use send::test_send;
pub use webhook::{webhook_challenge, webhook_receive};
