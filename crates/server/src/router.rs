//! HTTP router construction.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::api;
use crate::state::AppState;

/// Notion webhook bodies are small; anything larger is refused.
const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(api::index))
        .route("/health", get(api::health))
        .route(
            "/webhook/{source}",
            get(api::webhook_challenge).post(api::webhook_receive),
        )
        .route("/test/send", post(api::test_send))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
