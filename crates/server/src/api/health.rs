//! Service index and health endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct IndexResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub endpoints: Vec<&'static str>,
}

pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        service: "notion-relay",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        endpoints: vec![
            "GET /health",
            "GET /webhook/notion",
            "POST /webhook/notion",
            "POST /test/send",
        ],
    })
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub started_at: String,
    pub uptime_secs: i64,
    pub channel: String,
    pub webhook_secret_configured: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        started_at: state.started_at.to_rfc3339(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        channel: state.relay.channel_name().to_string(),
        webhook_secret_configured: state.webhook_secret.is_some(),
    })
}
