//! Runwatch CLI
//!
//! Watch the status of test runs from the terminal.

mod commands;
mod config;
mod render;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "runwatch")]
#[command(about = "Poll test run status from the command line", long_about = None)]
struct Cli {
    /// Server URL
    #[arg(
        long,
        global = true,
        env = "RUNWATCH_URL",
        default_value = "http://localhost:5000"
    )]
    url: String,

    /// Seconds before the first poll
    #[arg(long, global = true, env = "RUNWATCH_WARMUP_DELAY", default_value_t = 10)]
    warmup: u64,

    /// Seconds between polls
    #[arg(long, global = true, env = "RUNWATCH_POLL_INTERVAL", default_value_t = 20)]
    interval: u64,

    /// Seconds before a poll request is abandoned
    #[arg(long, global = true, env = "RUNWATCH_REQUEST_TIMEOUT", default_value_t = 15)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so results on stdout stay clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "runwatch_cli=info,runwatch_store=info,runwatch_client=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        url: cli.url,
        warmup_secs: cli.warmup,
        interval_secs: cli.interval,
        timeout_secs: cli.timeout,
    };

    handle_command(cli.command, &config).await
}
