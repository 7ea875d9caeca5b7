//! Test run poll endpoint

use crate::ApiClient;
use crate::error::Result;
use runwatch_core::domain::poll::PollResult;
use runwatch_core::domain::run::RunId;
use runwatch_core::dto::poll::{POLL_PATH, PollEnvelope, PollRequest};
use tracing::debug;

impl ApiClient {
    // =============================================================================
    // Run Status
    // =============================================================================

    /// Fetch the raw response envelope for a batch of runs
    ///
    /// Fails on transport errors, non-200 statuses and undecodable bodies. A
    /// decoded envelope is returned as-is, whatever its `status` says.
    pub async fn poll_envelope(&self, runs: &[RunId]) -> Result<PollEnvelope> {
        let url = format!("{}{}", self.base_url, POLL_PATH);
        debug!(runs = runs.len(), %url, "Polling run status");

        let response = self
            .client
            .post(&url)
            .json(&PollRequest::new(runs))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Fetch the status of a batch of runs
    ///
    /// # Arguments
    /// * `runs` - Identifiers to ask about; may be empty
    ///
    /// # Returns
    /// The envelope's `response` field, untouched, when `status` is `"ok"`.
    /// Any other status is a [`ClientError::Protocol`](crate::ClientError::Protocol).
    ///
    /// # Example
    /// ```no_run
    /// # use runwatch_client::ApiClient;
    /// # use runwatch_core::domain::run::RunId;
    /// # async fn example() -> runwatch_client::Result<()> {
    /// let client = ApiClient::new("http://localhost:5000");
    /// let result = client.poll_runs(&[RunId::from("run-1")]).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn poll_runs(&self, runs: &[RunId]) -> Result<PollResult> {
        let envelope = self.poll_envelope(runs).await?;
        Ok(envelope.into_result()?)
    }
}
