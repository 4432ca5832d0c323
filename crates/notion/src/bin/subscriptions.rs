//! relay-subscriptions — manage Notion webhook subscriptions for the relay.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use relay_core::config::{load_dotenv, Config};
use relay_notion::{NotionClient, Subscription, SubscriptionCache, SubscriptionManager};

// ── CLI ─────────────────────────────────────────────────────────────

/// Create, inspect and delete the webhook subscriptions Notion delivers to.
#[derive(Parser, Debug)]
#[command(name = "relay-subscriptions", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a webhook target.
    Create {
        /// Target URL (defaults to WEBHOOK_URL).
        #[arg(long)]
        url: Option<String>,
        /// Shared secret (random when omitted).
        #[arg(long)]
        secret: Option<String>,
    },
    /// List subscriptions known to Notion.
    List,
    /// Delete one subscription.
    Delete { id: String },
    /// Delete every subscription.
    DeleteAll {
        /// Required: confirms deleting everything.
        #[arg(long)]
        yes: bool,
    },
    /// Show one subscription, or the local cache when no id is given.
    Info { id: Option<String> },
    /// Print the relevant configuration (secrets redacted).
    Config,
}

fn print_subs(subs: &[Subscription]) -> anyhow::Result<()> {
    let shown: Vec<Subscription> = subs.iter().map(Subscription::redacted).collect();
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}

fn manager(config: &Config) -> anyhow::Result<SubscriptionManager> {
    let client = NotionClient::from_config(&config.notion).context("Notion client")?;
    Ok(SubscriptionManager::new(
        Arc::new(client),
        SubscriptionCache::new(&config.storage.data_dir),
    ))
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Command::Create { url, secret } => {
            let Some(url) = url.or_else(|| config.webhook.public_url.clone()) else {
                bail!("no target URL: pass --url or set WEBHOOK_URL");
            };
            let manager = manager(&config)?;
            let sub = manager.create(&url, secret).await?;
            print_subs(std::slice::from_ref(&sub))?;
            println!(
                "secret stored in {}; set NOTION_WEBHOOK_SECRET to it on the relay",
                manager.cache().path().display()
            );
        }
        Command::List => {
            let subs = manager(&config)?.list().await?;
            info!(count = subs.len(), "subscriptions listed");
            print_subs(&subs)?;
        }
        Command::Delete { id } => {
            manager(&config)?.delete(&id).await?;
            println!("deleted {id}");
        }
        Command::DeleteAll { yes } => {
            if !yes {
                bail!("refusing to delete every subscription without --yes");
            }
            let outcomes = manager(&config)?.delete_all().await?;
            let mut failed = 0;
            for outcome in &outcomes {
                match &outcome.result {
                    Ok(()) => println!("deleted {}", outcome.id),
                    Err(e) => {
                        failed += 1;
                        println!("failed  {}: {e}", outcome.id);
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} of {} deletions failed", outcomes.len());
            }
        }
        Command::Info { id: Some(id) } => {
            let sub = manager(&config)?.info(&id).await?;
            print_subs(std::slice::from_ref(&sub))?;
        }
        Command::Info { id: None } => {
            let cache = SubscriptionCache::new(&config.storage.data_dir);
            print_subs(&cache.load()?)?;
        }
        Command::Config => {
            let mut summary = config.redacted_summary();
            summary["subscriptions_cache"] =
                serde_json::json!(SubscriptionCache::new(&config.storage.data_dir).path());
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
