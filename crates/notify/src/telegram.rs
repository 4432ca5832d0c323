//! Telegram Bot API notifier.
//!
//! Delivers notifications via the Telegram Bot API `sendMessage` endpoint
//! and checks credentials with `getMe`. Rate limits surface as
//! [`NotifyError::RateLimited`] so the caller can decide whether to wait.

use std::time::Duration;

use relay_core::config::TelegramConfig;

use crate::traits::{Notification, Notifier, NotifyError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Escapes special characters for Telegram MarkdownV2 parse mode.
///
/// Telegram requires these characters to be escaped with a preceding backslash
/// when using MarkdownV2: `_`, `*`, `[`, `]`, `(`, `)`, `~`, `` ` ``, `>`,
/// `#`, `+`, `-`, `=`, `|`, `{`, `}`, `.`, `!`
pub fn escape_markdown_v2(text: &str) -> String {
    let special = ['_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!'];
    let mut result = String::with_capacity(text.len() * 2);
    for ch in text.chars() {
        if special.contains(&ch) {
            result.push('\\');
        }
        result.push(ch);
    }
    result
}

/// Escapes `&`, `<` and `>` for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(ch),
        }
    }
    result
}

/// Request URLs embed the bot token, so they are dropped from errors.
fn http_error(err: reqwest::Error) -> NotifyError {
    NotifyError::Http(err.without_url())
}

/// Normalize a configured parse mode. Empty means plain text.
fn canonical_parse_mode(parse_mode: Option<String>) -> Result<Option<String>, NotifyError> {
    let Some(mode) = parse_mode.map(|m| m.trim().to_string()).filter(|m| !m.is_empty()) else {
        return Ok(None);
    };
    if mode.eq_ignore_ascii_case("markdownv2") {
        Ok(Some("MarkdownV2".to_string()))
    } else if mode.eq_ignore_ascii_case("html") {
        Ok(Some("HTML".to_string()))
    } else {
        Err(NotifyError::Config(format!(
            "unsupported Telegram parse mode {mode:?} (use MarkdownV2, HTML or leave unset)"
        )))
    }
}

/// Sends notifications to one Telegram chat or channel.
#[derive(Debug)]
pub struct TelegramNotifier {
    api_base: String,
    bot_token: String,
    chat_id: String,
    parse_mode: Option<String>,
    client: reqwest::Client,
}

impl TelegramNotifier {
    /// Creates a notifier for `chat_id` (numeric id or `@channel_name`).
    ///
    /// Returns [`NotifyError::Config`] if the token or chat id is empty, or if
    /// `parse_mode` is not one the formatter can produce (`MarkdownV2`, `HTML`).
    pub fn new(
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        parse_mode: Option<String>,
    ) -> Result<Self, NotifyError> {
        let bot_token = bot_token.into();
        let chat_id = chat_id.into();

        if bot_token.is_empty() {
            return Err(NotifyError::Config(
                "Telegram bot token must not be empty".to_string(),
            ));
        }
        if chat_id.is_empty() {
            return Err(NotifyError::Config(
                "Telegram channel id must not be empty".to_string(),
            ));
        }

        let parse_mode = canonical_parse_mode(parse_mode)?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(http_error)?;

        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
            parse_mode,
            client,
        })
    }

    /// Creates a notifier from the `TELEGRAM_*` configuration.
    pub fn from_config(config: &TelegramConfig) -> Result<Self, NotifyError> {
        let token = config.bot_token.clone().ok_or_else(|| {
            NotifyError::Config("TELEGRAM_BOT_TOKEN is not set".to_string())
        })?;
        let chat_id = config.channel_id.clone().ok_or_else(|| {
            NotifyError::Config("TELEGRAM_CHANNEL_ID is not set".to_string())
        })?;
        Self::new(&config.api_base, token, chat_id, config.parse_mode.clone())
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn parse_mode(&self) -> Option<&str> {
        self.parse_mode.as_deref()
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// Turn a Bot API reply into a result.
    fn check_reply(
        status: reqwest::StatusCode,
        body: &serde_json::Value,
    ) -> Result<(), NotifyError> {
        if body.get("ok") == Some(&serde_json::Value::Bool(true)) {
            return Ok(());
        }

        // Handle rate limiting (HTTP 429).
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = body
                .get("parameters")
                .and_then(|p| p.get("retry_after"))
                .and_then(|v| v.as_u64())
                .unwrap_or(30);
            return Err(NotifyError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let description = body
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Telegram API error");

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(NotifyError::Unauthorized(description.to_string()));
        }

        Err(NotifyError::Api(format!("{status}: {description}")))
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    /// Sends a notification via the Telegram `sendMessage` API.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": notification.body,
            "disable_web_page_preview": false,
        });

        if let Some(ref mode) = self.parse_mode {
            body["parse_mode"] = serde_json::Value::String(mode.clone());
        }

        tracing::debug!(
            chat_id = %self.chat_id,
            parse_mode = ?self.parse_mode,
            "Sending Telegram message"
        );

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(http_error)?;

        let status = response.status();
        let resp_body: serde_json::Value = response.json().await.map_err(http_error)?;

        Self::check_reply(status, &resp_body)?;
        tracing::info!(
            chat_id = %self.chat_id,
            subject = %notification.subject,
            "Telegram message sent"
        );
        Ok(())
    }

    /// Calls `getMe` and returns the bot's username.
    async fn test(&self) -> Result<String, NotifyError> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(http_error)?;
        let status = response.status();
        let resp_body: serde_json::Value = response.json().await.map_err(http_error)?;

        Self::check_reply(status, &resp_body)?;

        let username = resp_body
            .get("result")
            .and_then(|r| r.get("username"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        tracing::info!(bot = %username, "Telegram connection ok");
        Ok(username)
    }

    /// Returns the channel name for this notifier.
    fn channel_name(&self) -> &str {
        "telegram"
    }
}
