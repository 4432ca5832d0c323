//! Process startup: logging and client construction.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use relay_core::config::{Config, LogConfig};
use relay_notify::{Formatter, Markup, TelegramNotifier};
use relay_notion::NotionClient;

use crate::relay::Relay;
use crate::state::AppState;

/// Log target for events that carry secrets. They reach the console but are
/// never written to the log file.
pub const CONSOLE_ONLY_TARGET: &str = "notion_relay::console_only";

fn file_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter_fn(|meta| meta.target() != CONSOLE_ONLY_TARGET))
}

/// Install the console and log-file layers.
///
/// The returned guard flushes the file writer on drop and must live until
/// the process exits. When the log directory cannot be created, only the
/// console layer is installed.
pub fn init_tracing(log: &LogConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_target(false).with_level(true);

    if let Err(e) = std::fs::create_dir_all(&log.dir) {
        tracing_subscriber::registry().with(filter).with(console).init();
        warn!(dir = %log.dir.display(), error = %e, "log directory unavailable; logging to console only");
        return None;
    }

    let appender = tracing_appender::rolling::never(&log.dir, &log.file);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer(writer))
        .init();
    info!("logging to {}", log.dir.join(&log.file).display());
    Some(guard)
}

/// Build the relay from configuration. Callers validate required variables first.
pub fn build_relay(config: &Config) -> anyhow::Result<Relay> {
    let source = NotionClient::from_config(&config.notion)?;
    let sink = TelegramNotifier::from_config(&config.telegram)?;
    let formatter = Formatter::new(Markup::from_parse_mode(sink.parse_mode()));
    info!(
        channel = sink.chat_id(),
        markup = ?formatter.markup(),
        "relay ready"
    );
    Ok(Relay::new(
        Arc::new(source),
        Arc::new(sink),
        formatter,
        Duration::from_millis(config.telegram.send_delay_ms),
    ))
}

pub fn build_app_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let relay = Arc::new(build_relay(config)?);
    if config.notion.webhook_secret.is_none() {
        warn!("NOTION_WEBHOOK_SECRET is not set; only the subscription handshake will be accepted");
    }
    Ok(Arc::new(AppState::new(
        relay,
        config.notion.webhook_secret.clone(),
    )))
}
