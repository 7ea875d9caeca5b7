//! Configuration module
//!
//! Maps command-line options onto the poller configuration.

use anyhow::Result;
use std::time::Duration;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the server exposing the poll endpoint
    pub url: String,
    pub warmup_secs: u64,
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl Config {
    /// Builds and validates the poller configuration
    pub fn poller_config(&self) -> Result<runwatch_store::Config> {
        let mut config = runwatch_store::Config::new(self.url.clone())
            .with_warmup_delay(Duration::from_secs(self.warmup_secs))
            .with_poll_interval(Duration::from_secs(self.interval_secs));
        config.request_timeout = Duration::from_secs(self.timeout_secs);
        config.validate()?;
        Ok(config)
    }
}
