//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod poll;
mod watch;

use anyhow::Result;
use clap::Subcommand;
use runwatch_core::domain::run::RunId;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Keep polling the given runs and print every update until Ctrl-C
    Watch {
        /// Run identifiers to track
        #[arg(required = true)]
        runs: Vec<String>,
    },
    /// Poll the given runs once and print the result
    Poll {
        /// Run identifiers to ask about
        #[arg(required = true)]
        runs: Vec<String>,
    },
}

/// Handle a CLI command
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Watch { runs } => watch::watch_runs(config, to_run_ids(runs)).await,
        Commands::Poll { runs } => poll::poll_once(config, to_run_ids(runs)).await,
    }
}

fn to_run_ids(raw: Vec<String>) -> Vec<RunId> {
    raw.into_iter().map(RunId::from).collect()
}
