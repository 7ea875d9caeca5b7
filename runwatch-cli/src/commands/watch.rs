//! Watch command
//!
//! Runs the status poller over a fixed set of runs and prints each
//! published result.

use anyhow::{Context, Result};
use colored::*;
use runwatch_core::domain::run::RunId;
use runwatch_store::{RunIdRegistry, RunStatusPoller};
use tracing::{error, info};

use crate::config::Config;
use crate::render::{is_empty_result, print_statuses};

/// Watch `runs` until interrupted
pub async fn watch_runs(config: &Config, runs: Vec<RunId>) -> Result<()> {
    let poller_config = config.poller_config()?;

    let registry = RunIdRegistry::with_runs(runs);
    let mut poller = RunStatusPoller::connect(&registry, &poller_config)?;

    println!(
        "{}",
        format!(
            "Watching {} run(s) on {} (first poll in {:?}, then every {:?})",
            registry.len(),
            poller_config.base_url,
            poller_config.warmup_delay,
            poller_config.poll_interval
        )
        .bold()
    );

    let subscription = poller.subscribe(|result| {
        if is_empty_result(result) {
            return;
        }
        println!();
        println!(
            "{} {}",
            "▸".cyan(),
            chrono::Local::now().format("%H:%M:%S").to_string().dimmed()
        );
        print_statuses(result);
    });

    if let Err(e) = tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")
    {
        error!("{:#}", e);
    }

    subscription.unsubscribe();
    poller.shutdown();

    let stats = poller.stats();
    info!(
        "Stopped after {} poll(s): {} published, {} failed, {} stale",
        stats.polls_started, stats.published, stats.failures, stats.stale
    );

    Ok(())
}
