use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

/// Collects the names of required variables that are missing.
fn require(missing: &mut Vec<&'static str>, value: &Option<String>, name: &'static str) {
    if value.is_none() {
        missing.push(name);
    }
}

fn missing_to_error(missing: Vec<&'static str>) -> Result<(), RelayError> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(RelayError::Config(format!(
            "missing environment variables: {}",
            missing.join(", ")
        )))
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub notion: NotionConfig,
    pub telegram: TelegramConfig,
    pub webhook: WebhookConfig,
    pub polling: PollingConfig,
    pub storage: StorageConfig,
    pub log: LogConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `RELAY_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("RELAY_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            notion: NotionConfig::from_env_profiled(p),
            telegram: TelegramConfig::from_env_profiled(p),
            webhook: WebhookConfig::from_env_profiled(p),
            polling: PollingConfig::from_env_profiled(p),
            storage: StorageConfig::from_env_profiled(p),
            log: LogConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Everything the webhook server and the polling loop need.
    pub fn require_relay(&self) -> Result<(), RelayError> {
        let mut missing = Vec::new();
        require(&mut missing, &self.notion.token, "NOTION_TOKEN");
        require(&mut missing, &self.telegram.bot_token, "TELEGRAM_BOT_TOKEN");
        require(&mut missing, &self.telegram.channel_id, "TELEGRAM_CHANNEL_ID");
        missing_to_error(missing)
    }

    /// Polling additionally needs the database to query.
    pub fn require_polling(&self) -> Result<(), RelayError> {
        let mut missing = Vec::new();
        require(&mut missing, &self.notion.token, "NOTION_TOKEN");
        require(&mut missing, &self.notion.database_id, "NOTION_DATABASE_ID");
        require(&mut missing, &self.telegram.bot_token, "TELEGRAM_BOT_TOKEN");
        require(&mut missing, &self.telegram.channel_id, "TELEGRAM_CHANNEL_ID");
        missing_to_error(missing)
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  notion:    api={}, database={}, webhook_secret={}",
            self.notion.api_base,
            self.notion.database_id.as_deref().unwrap_or("(none)"),
            if self.notion.webhook_secret.is_some() { "set" } else { "(none)" }
        );
        tracing::info!(
            "  telegram:  channel={}, parse_mode={}",
            self.telegram.channel_id.as_deref().unwrap_or("(none)"),
            self.telegram.parse_mode.as_deref().unwrap_or("(plain)")
        );
        tracing::info!(
            "  webhook:   bind={}, public_url={}",
            self.webhook.bind_addr(),
            self.webhook.public_url.as_deref().unwrap_or("(none)")
        );
        tracing::info!(
            "  polling:   interval={}s, new_items_only={}",
            self.polling.interval_secs,
            self.polling.new_items_only
        );
    }

    /// Return a redacted view safe for printing (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "notion": {
                "api_base": self.notion.api_base,
                "version": self.notion.version,
                "database_id": self.notion.database_id,
                "token_configured": self.notion.token.is_some(),
                "webhook_secret_configured": self.notion.webhook_secret.is_some(),
            },
            "telegram": {
                "channel_id": self.telegram.channel_id,
                "parse_mode": self.telegram.parse_mode,
                "token_configured": self.telegram.bot_token.is_some(),
            },
            "webhook": {
                "host": self.webhook.host,
                "port": self.webhook.port,
                "public_url": self.webhook.public_url,
            },
            "polling": {
                "interval_secs": self.polling.interval_secs,
                "new_items_only": self.polling.new_items_only,
            },
        })
    }
}

// ── Notion ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    pub token: Option<String>,
    pub database_id: Option<String>,
    pub webhook_secret: Option<String>,
    pub api_base: String,
    pub version: String,
    pub properties: PropertyNames,
}

impl NotionConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            token: profiled_env_opt(p, "NOTION_TOKEN"),
            database_id: profiled_env_opt(p, "NOTION_DATABASE_ID"),
            webhook_secret: profiled_env_opt(p, "NOTION_WEBHOOK_SECRET"),
            api_base: profiled_env_or(p, "NOTION_API_BASE", "https://api.notion.com"),
            version: profiled_env_or(p, "NOTION_VERSION", "2022-06-28"),
            properties: PropertyNames::from_env_profiled(p),
        }
    }
}

/// Names of the database properties the relay reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PropertyNames {
    pub status: String,
    pub tags: String,
    pub description: String,
    pub deadline: String,
    pub executor: String,
    pub assigned_by: String,
    pub telegram_usernames: String,
    pub project: String,
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self {
            status: "Status".to_string(),
            tags: "Tags".to_string(),
            description: "Description".to_string(),
            deadline: "Deadline".to_string(),
            executor: "Executor".to_string(),
            assigned_by: "Assigned By".to_string(),
            telegram_usernames: "Telegram Username".to_string(),
            project: "Projects (1)".to_string(),
        }
    }
}

impl PropertyNames {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            status: profiled_env_or(p, "NOTION_PROP_STATUS", &d.status),
            tags: profiled_env_or(p, "NOTION_PROP_TAGS", &d.tags),
            description: profiled_env_or(p, "NOTION_PROP_DESCRIPTION", &d.description),
            deadline: profiled_env_or(p, "NOTION_PROP_DEADLINE", &d.deadline),
            executor: profiled_env_or(p, "NOTION_PROP_EXECUTOR", &d.executor),
            assigned_by: profiled_env_or(p, "NOTION_PROP_ASSIGNED_BY", &d.assigned_by),
            telegram_usernames: profiled_env_or(
                p,
                "NOTION_PROP_TELEGRAM_USERNAME",
                &d.telegram_usernames,
            ),
            project: profiled_env_or(p, "NOTION_PROP_PROJECT", &d.project),
        }
    }
}

// ── Telegram ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub channel_id: Option<String>,
    pub api_base: String,
    /// `None` sends plain text. `MarkdownV2` and `HTML` switch the formatter to
    /// the matching escaping; any other value is rejected at startup.
    pub parse_mode: Option<String>,
    pub send_delay_ms: u64,
}

impl TelegramConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            bot_token: profiled_env_opt(p, "TELEGRAM_BOT_TOKEN"),
            channel_id: profiled_env_opt(p, "TELEGRAM_CHANNEL_ID"),
            api_base: profiled_env_or(p, "TELEGRAM_API_BASE", "https://api.telegram.org"),
            parse_mode: profiled_env_opt(p, "TELEGRAM_PARSE_MODE"),
            send_delay_ms: profiled_env_u64(p, "TELEGRAM_SEND_DELAY_MS", 1000),
        }
    }
}

// ── Webhook server ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub host: String,
    pub port: u16,
    /// Public URL Notion should call; used when creating subscriptions.
    pub public_url: Option<String>,
}

impl WebhookConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "WEBHOOK_HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "WEBHOOK_PORT", 8000),
            public_url: profiled_env_opt(p, "WEBHOOK_URL"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── Polling ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    pub interval_secs: u64,
    pub new_items_only: bool,
}

impl PollingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            interval_secs: profiled_env_u64(p, "CHECK_INTERVAL", 300).max(1),
            new_items_only: profiled_env_bool(p, "NEW_ITEMS_ONLY", true),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "RELAY_DATA_DIR", "data")),
        }
    }
}

// ── Logging ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub file: String,
}

impl LogConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            dir: PathBuf::from(profiled_env_or(p, "LOG_DIR", ".")),
            file: profiled_env_or(p, "LOG_FILE", "notion-relay.log"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own profile prefix so parallel tests never share keys.

    #[test]
    fn profiled_values_take_precedence() {
        env::set_var("CFGA_NOTION_TOKEN", "secret_profiled");
        env::set_var("CFGA_WEBHOOK_PORT", "9100");
        let config = Config::for_profile("cfga");
        assert_eq!(config.profile, "CFGA");
        assert_eq!(config.notion.token.as_deref(), Some("secret_profiled"));
        assert_eq!(config.webhook.port, 9100);
        env::remove_var("CFGA_NOTION_TOKEN");
        env::remove_var("CFGA_WEBHOOK_PORT");
    }

    #[test]
    fn polling_flags_parse() {
        env::set_var("CFGB_NEW_ITEMS_ONLY", "false");
        env::set_var("CFGB_CHECK_INTERVAL", "0");
        let config = Config::for_profile("CFGB");
        assert!(!config.polling.new_items_only);
        assert_eq!(config.polling.interval_secs, 1, "interval is clamped to 1s");
        env::remove_var("CFGB_NEW_ITEMS_ONLY");
        env::remove_var("CFGB_CHECK_INTERVAL");
    }

    #[test]
    fn unparsable_numbers_fall_back_to_defaults() {
        env::set_var("CFGC_WEBHOOK_PORT", "not-a-port");
        env::set_var("CFGC_TELEGRAM_SEND_DELAY_MS", "soon");
        let config = Config::for_profile("CFGC");
        assert_eq!(config.webhook.port, 8000);
        assert_eq!(config.telegram.send_delay_ms, 1000);
        env::remove_var("CFGC_WEBHOOK_PORT");
        env::remove_var("CFGC_TELEGRAM_SEND_DELAY_MS");
    }

    #[test]
    fn require_polling_lists_every_missing_var() {
        let mut config = Config::for_profile("CFGD");
        config.notion.token = None;
        config.notion.database_id = None;
        config.telegram.bot_token = Some("123:abc".to_string());
        config.telegram.channel_id = None;

        let err = config.require_polling().unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, RelayError::Config(_)));
        assert!(msg.contains("NOTION_TOKEN"));
        assert!(msg.contains("NOTION_DATABASE_ID"));
        assert!(msg.contains("TELEGRAM_CHANNEL_ID"));
        assert!(!msg.contains("TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn require_relay_passes_when_complete() {
        let mut config = Config::for_profile("CFGE");
        config.notion.token = Some("secret_x".to_string());
        config.telegram.bot_token = Some("123:abc".to_string());
        config.telegram.channel_id = Some("@channel".to_string());
        assert!(config.require_relay().is_ok());
    }

    #[test]
    fn redacted_summary_hides_secrets() {
        let mut config = Config::for_profile("CFGF");
        config.notion.token = Some("secret_very_private".to_string());
        config.notion.webhook_secret = Some("whsec".to_string());
        let summary = config.redacted_summary().to_string();
        assert!(!summary.contains("secret_very_private"));
        assert!(!summary.contains("whsec"));
        assert!(summary.contains("\"token_configured\":true"));
    }

    #[test]
    fn default_property_names() {
        let names = PropertyNames::default();
        assert_eq!(names.status, "Status");
        assert_eq!(names.project, "Projects (1)");
    }
}
