mod api;
mod cli;
mod relay;
mod router;
mod scheduler;
mod startup;
mod state;

use clap::Parser;

use relay_core::config::load_dotenv;
use relay_core::Config;

fn load_config() -> Config {
    load_dotenv();
    Config::from_env()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = load_config();
    let _log_guard = startup::init_tracing(&config.log);
    config.log_summary();

    if let Err(e) = cli::dispatch(&config, cli.command).await {
        tracing::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
