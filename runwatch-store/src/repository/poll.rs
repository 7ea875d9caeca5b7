//! Poll repository
//!
//! Abstracts the one request the poller makes: "what is the status of these
//! runs?"

use async_trait::async_trait;
use runwatch_client::{ApiClient, ClientError};
use runwatch_core::domain::poll::PollResult;
use runwatch_core::domain::run::RunId;

/// Source of run status for the poller
#[async_trait]
pub trait PollRepository: Send + Sync {
    /// Fetches the status of `runs`
    ///
    /// Returns the server's payload on success. Every failure, transport or
    /// protocol, is reported as a [`ClientError`] for the poller to log.
    async fn poll(&self, runs: &[RunId]) -> Result<PollResult, ClientError>;
}

#[async_trait]
impl PollRepository for ApiClient {
    async fn poll(&self, runs: &[RunId]) -> Result<PollResult, ClientError> {
        self.poll_runs(runs).await
    }
}
