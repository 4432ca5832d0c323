//! Notifier trait definition and shared error types.

use std::collections::HashMap;

use relay_core::RelayError;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("API error: {0}")]
    Api(String),
}

impl From<NotifyError> for RelayError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::Config(msg) => RelayError::Config(msg),
            NotifyError::Unauthorized(msg) => RelayError::Auth(msg),
            other => RelayError::Delivery(other.to_string()),
        }
    }
}

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Notification {
    /// Short subject, used for logging (the record title).
    pub subject: String,
    /// The rendered message text.
    pub body: String,
    /// Additional metadata (e.g., record id, event type).
    pub metadata: HashMap<String, String>,
}

impl Notification {
    /// An ad hoc text message with no record attached.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            subject: "custom message".to_string(),
            body: body.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// The source record id, when the notification was built from one.
    pub fn record_id(&self) -> Option<&str> {
        self.metadata.get("record_id").map(String::as_str)
    }
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification through this channel.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Check that the channel is reachable and the credentials are valid.
    async fn test(&self) -> Result<String, NotifyError>;

    /// Human-readable name for this channel (e.g., "telegram").
    fn channel_name(&self) -> &str;
}

/// Result of delivering one notification.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DispatchResult {
    pub channel: String,
    pub record_id: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_relay_kinds() {
        let auth: RelayError = NotifyError::Unauthorized("bad token".into()).into();
        assert!(matches!(auth, RelayError::Auth(_)));

        let limited: RelayError = NotifyError::RateLimited { retry_after_secs: 3 }.into();
        assert!(matches!(limited, RelayError::Delivery(_)));

        let config: RelayError = NotifyError::Config("no chat".into()).into();
        assert!(config.is_fatal());
    }

    #[test]
    fn text_notification_has_no_record() {
        let n = Notification::text("hello");
        assert_eq!(n.body, "hello");
        assert!(n.record_id().is_none());

        let n = n.with_metadata("record_id", "abc");
        assert_eq!(n.record_id(), Some("abc"));
    }
}
