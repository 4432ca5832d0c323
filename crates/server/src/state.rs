use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::relay::Relay;

/// Shared, read-only state of the HTTP receiver.
pub struct AppState {
    pub relay: Arc<Relay>,
    /// HMAC secret for inbound webhooks. Without one only the subscription
    /// handshake is accepted.
    pub webhook_secret: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(relay: Arc<Relay>, webhook_secret: Option<String>) -> Self {
        Self {
            relay,
            webhook_secret: webhook_secret.filter(|s| !s.is_empty()),
            started_at: Utc::now(),
        }
    }
}
