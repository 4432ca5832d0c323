//! CLI argument parsing and subcommand dispatch.

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use relay_core::Config;

use crate::router::build_router;
use crate::scheduler::{initial_state, run_scheduler, RunMode};
use crate::startup::{build_app_state, build_relay};

/// Relay new and changed Notion database items to a Telegram channel.
#[derive(Parser, Debug)]
#[command(name = "notion-relay", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the webhook receiver.
    Serve,
    /// Check the Notion and Telegram connections.
    Test,
    /// Run one polling cycle.
    Once,
    /// Poll every CHECK_INTERVAL seconds until interrupted.
    Schedule,
    /// Send a message to the channel.
    Send {
        /// Message text; several words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
}

pub async fn dispatch(config: &Config, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Serve => serve(config).await,
        Command::Test => test(config).await,
        Command::Once => once(config).await,
        Command::Schedule => schedule(config).await,
        Command::Send { text } => send(config, &text.join(" ")).await,
    }
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    config.require_relay()?;
    let state = build_app_state(config)?;
    let app = build_router(state);

    let addr = config.webhook.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("webhook receiver listening on http://{}", addr);
    if let Some(url) = &config.webhook.public_url {
        info!("public webhook URL: {}", url);
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;
    Ok(())
}

async fn test(config: &Config) -> anyhow::Result<()> {
    config.require_polling()?;
    let relay = build_relay(config)?;
    let (source, sink) = relay.check().await;

    let mut failed = false;
    match source {
        Ok(title) => info!("Notion OK: database \"{}\"", title),
        Err(e) => {
            error!(kind = e.kind(), error = %e, "Notion check failed");
            failed = true;
        }
    }
    match sink {
        Ok(bot) => info!("Telegram OK: bot @{}", bot),
        Err(e) => {
            error!(kind = e.kind(), error = %e, "Telegram check failed");
            failed = true;
        }
    }
    if failed {
        bail!("connection test failed");
    }
    Ok(())
}

async fn once(config: &Config) -> anyhow::Result<()> {
    config.require_polling()?;
    let relay = build_relay(config)?;
    let mut state = initial_state(RunMode::Once, config.polling.new_items_only, Utc::now());
    let report = relay.poll_once(&mut state, config.polling.new_items_only).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn schedule(config: &Config) -> anyhow::Result<()> {
    config.require_polling()?;
    let relay = build_relay(config)?;
    let state = initial_state(RunMode::Schedule, config.polling.new_items_only, Utc::now());
    let interval = std::time::Duration::from_secs(config.polling.interval_secs);

    run_scheduler(
        &relay,
        state,
        interval,
        config.polling.new_items_only,
        async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        },
    )
    .await;
    Ok(())
}

async fn send(config: &Config, text: &str) -> anyhow::Result<()> {
    config.require_relay()?;
    let relay = build_relay(config)?;
    relay.send_text(text).await?;
    println!("sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send_joins_words() {
        let cli = Cli::try_parse_from(["notion-relay", "send", "hello", "world"]).unwrap();
        match cli.command {
            Command::Send { text } => assert_eq!(text.join(" "), "hello world"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_send_requires_text() {
        assert!(Cli::try_parse_from(["notion-relay", "send"]).is_err());
    }

    #[test]
    fn test_parse_modes() {
        for (arg, expected) in [("serve", "Serve"), ("test", "Test"), ("once", "Once"), ("schedule", "Schedule")] {
            let cli = Cli::try_parse_from(["notion-relay", arg]).unwrap();
            assert_eq!(format!("{:?}", cli.command), expected);
        }
    }
}
