//! Poller configuration
//!
//! Defines the server location and the timings of the status poller.

use std::time::Duration;

/// Default delay before the one-shot warm-up poll
pub const DEFAULT_WARMUP_DELAY: Duration = Duration::from_secs(10);

/// Default period of the recurring poll
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Default upper bound on a single poll request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Poller configuration
///
/// The timings default to a 10 second warm-up followed by a poll every 20
/// seconds. The request timeout keeps a stuck request from holding up the
/// recurring loop indefinitely.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server base URL (e.g., "http://localhost:5000")
    pub base_url: String,

    /// Delay before the one-shot warm-up poll
    pub warmup_delay: Duration,

    /// Period of the recurring poll
    pub poll_interval: Duration,

    /// Upper bound on a single poll request
    pub request_timeout: Duration,

    /// Whether shutdown also cancels a warm-up poll that has not fired yet
    pub cancel_warmup_on_shutdown: bool,
}

impl Config {
    /// Creates a new configuration with default timings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            warmup_delay: DEFAULT_WARMUP_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cancel_warmup_on_shutdown: false,
        }
    }

    /// Overrides the warm-up delay
    pub fn with_warmup_delay(mut self, delay: Duration) -> Self {
        self.warmup_delay = delay;
        self
    }

    /// Overrides the recurring poll period
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.is_empty() {
            anyhow::bail!("base_url cannot be empty");
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            anyhow::bail!("base_url must start with http:// or https://");
        }

        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new("http://localhost:5000")
    }
}
