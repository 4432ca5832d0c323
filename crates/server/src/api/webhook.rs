//! Inbound webhook receiver.
//!
//! Flow per request: known source → signature check → JSON parse →
//! classify → respond. Page changes are relayed in a spawned task so the
//! sender gets its 200 right away; nothing is deduplicated.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{debug, error, info, warn};

use relay_notion::signature::{verify, SIGNATURE_HEADER};
use relay_notion::{EventAction, WebhookEvent};

use crate::startup::CONSOLE_ONLY_TARGET;
use crate::state::AppState;

use super::{error_response, ok_response};

const KNOWN_SOURCES: &[&str] = &["notion"];

fn is_known(source: &str) -> bool {
    KNOWN_SOURCES.contains(&source)
}

/// Enough of a secret to tell tokens apart in the log file.
fn token_prefix(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{prefix}…")
}

/// `GET /webhook/{source}`: echoes `?challenge=` for endpoint validation.
pub async fn webhook_challenge(
    Path(source): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !is_known(&source) {
        return error_response(StatusCode::NOT_FOUND, format!("unknown source: {source}"));
    }
    match params.get("challenge") {
        Some(challenge) => {
            info!(source = %source, "webhook challenge answered");
            Json(serde_json::json!({"challenge": challenge})).into_response()
        }
        None => Json(serde_json::json!({"status": "ok", "source": source})).into_response(),
    }
}

/// `POST /webhook/{source}`: signed change notification.
pub async fn webhook_receive(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !is_known(&source) {
        warn!(source = %source, "webhook for unknown source");
        return error_response(StatusCode::NOT_FOUND, format!("unknown source: {source}"));
    }

    if let Some(secret) = state.webhook_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        if !verify(secret, &body, signature) {
            warn!(
                source = %source,
                signature_present = signature.is_some(),
                bytes = body.len(),
                "webhook signature rejected"
            );
            return error_response(StatusCode::UNAUTHORIZED, "invalid signature");
        }
    }

    let event = match WebhookEvent::parse(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(source = %source, error = %e, "webhook body is not valid JSON");
            return error_response(StatusCode::BAD_REQUEST, format!("invalid JSON: {e}"));
        }
    };
    debug!(payload = %String::from_utf8_lossy(&body), "webhook payload");

    let action = event.classify();
    if state.webhook_secret.is_none() && !matches!(action, EventAction::Verification { .. }) {
        warn!(source = %source, "webhook rejected: no secret configured");
        return error_response(StatusCode::UNAUTHORIZED, "webhook secret not configured");
    }

    match action {
        EventAction::Verification { token } => {
            warn!(
                target: CONSOLE_ONLY_TARGET,
                verification_token = %token,
                "subscription handshake received; set NOTION_WEBHOOK_SECRET to this token"
            );
            info!(
                token_prefix = %token_prefix(&token),
                "subscription handshake received; full token printed to the console only"
            );
        }
        EventAction::Ignored { reason } => {
            info!(
                event_id = event.id.as_deref().unwrap_or("-"),
                event_type = event.event_type.as_deref().unwrap_or("-"),
                reason = %reason,
                "webhook event ignored"
            );
        }
        EventAction::Page {
            page_id,
            kind,
            updated_properties,
        } => {
            info!(
                event_id = event.id.as_deref().unwrap_or("-"),
                page_id = %page_id,
                change = ?kind,
                properties = ?updated_properties,
                "webhook event accepted"
            );
            let relay = state.relay.clone();
            tokio::spawn(async move {
                match relay.relay_page(&page_id, kind).await {
                    Ok(result) if result.success => {}
                    Ok(result) => warn!(
                        page_id = %page_id,
                        error = result.error.as_deref().unwrap_or("unknown"),
                        "webhook change not delivered"
                    ),
                    Err(e) => error!(
                        page_id = %page_id,
                        kind = e.kind(),
                        error = %e,
                        "failed to relay webhook change"
                    ),
                }
            });
        }
    }

    ok_response()
}
