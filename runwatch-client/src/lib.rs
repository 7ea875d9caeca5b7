//! Runwatch HTTP Client
//!
//! A small, typed client for the test run poll endpoint.
//!
//! The server exposes a single batch endpoint: the client sends the run
//! identifiers it cares about and receives an envelope whose `response`
//! field carries their status.
//!
//! # Example
//!
//! ```no_run
//! use runwatch_client::ApiClient;
//! use runwatch_core::domain::run::RunId;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), runwatch_client::ClientError> {
//!     let client = ApiClient::new("http://localhost:5000");
//!
//!     let statuses = client.poll_runs(&[RunId::from("run-1")]).await?;
//!     println!("{statuses}");
//!     Ok(())
//! }
//! ```

pub mod error;
mod runs;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use runwatch_core::domain::poll::PollResult;
pub use runwatch_core::dto::poll::PollEnvelope;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP client for the poll API
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Base URL of the server (e.g., "http://localhost:5000")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl ApiClient {
    /// Create a new client with reqwest defaults
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the server (e.g., "http://localhost:5000")
    ///
    /// # Example
    /// ```
    /// use runwatch_client::ApiClient;
    ///
    /// let client = ApiClient::new("http://localhost:5000");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use runwatch_client::ApiClient;
    /// use reqwest::Client;
    ///
    /// let client = ApiClient::with_client("http://localhost:5000", Client::new());
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Create a client whose requests give up after `timeout`
    ///
    /// A timed-out request surfaces as [`ClientError::RequestFailed`].
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check for a 200 status and deserialize the JSON body
    ///
    /// Any other status, including other 2xx codes, is reported as an
    /// [`ClientError::ApiError`] carrying the response text.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status != StatusCode::OK {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
