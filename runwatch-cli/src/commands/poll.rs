//! One-shot poll command

use anyhow::{Context, Result};
use colored::*;
use runwatch_client::ApiClient;
use runwatch_core::domain::run::RunId;

use crate::config::Config;
use crate::render::print_statuses;

/// Poll `runs` once and print the server's answer
///
/// Any soft failure the poller would swallow is reported here as an error,
/// so the process exits non-zero.
pub async fn poll_once(config: &Config, runs: Vec<RunId>) -> Result<()> {
    let poller_config = config.poller_config()?;
    let client = ApiClient::with_timeout(poller_config.base_url, poller_config.request_timeout)
        .context("Failed to build HTTP client")?;

    let result = client
        .poll_runs(&runs)
        .await
        .with_context(|| format!("Failed to poll {} run(s)", runs.len()))?;

    println!("{}", format!("Status of {} run(s):", runs.len()).bold());
    print_statuses(&result);

    Ok(())
}
