use thiserror::Error;

/// Top-level error kinds of the relay.
///
/// Crate-specific errors (source, sink, subscriptions) convert into one of
/// these so callers can decide whether to abort, reject or log and continue.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Missing or invalid configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Bad token or bad signature. The request is rejected.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Network failure or unusable upstream response. The cycle is aborted.
    #[error("connection error: {0}")]
    Connection(String),

    /// The message could not be delivered. Logged, not retried from a queue.
    #[error("delivery error: {0}")]
    Delivery(String),
}

impl RelayError {
    /// Short machine-friendly label, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::Config(_) => "config",
            RelayError::Auth(_) => "auth",
            RelayError::Connection(_) => "connection",
            RelayError::Delivery(_) => "delivery",
        }
    }

    /// Only configuration errors stop the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RelayError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_config_is_fatal() {
        assert!(RelayError::Config("x".into()).is_fatal());
        assert!(!RelayError::Auth("x".into()).is_fatal());
        assert!(!RelayError::Connection("x".into()).is_fatal());
        assert!(!RelayError::Delivery("x".into()).is_fatal());
    }

    #[test]
    fn display_includes_kind() {
        let err = RelayError::Delivery("chat not found".into());
        assert_eq!(err.to_string(), "delivery error: chat not found");
        assert_eq!(err.kind(), "delivery");
    }
}
