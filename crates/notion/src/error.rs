//! Notion API error types.

use relay_core::RelayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Notion API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<SourceError> for RelayError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Unauthorized(msg) => RelayError::Auth(msg),
            SourceError::Config(msg) => RelayError::Config(msg),
            other => RelayError::Connection(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_relay_errors() {
        let auth: RelayError = SourceError::Unauthorized("API token is invalid.".into()).into();
        assert_eq!(auth.kind(), "auth");

        let missing: RelayError = SourceError::NotFound("page".into()).into();
        assert_eq!(missing.kind(), "connection");

        let config: RelayError = SourceError::Config("NOTION_TOKEN is not set".into()).into();
        assert!(config.is_fatal());
    }
}
