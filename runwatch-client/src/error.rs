//! Error types for the runwatch client

use runwatch_core::dto::poll::PollRejection;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when polling the server
///
/// Every variant is a soft failure from the poller's point of view: it is
/// logged and the next tick tries again.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a response arrived (offline, timeout, refused)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Server answered with a status other than 200
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body, if any
        message: String,
    },

    /// Response body was not the expected JSON envelope
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Envelope decoded but its status was not "ok"
    #[error("Server rejected poll (status {status:?}): {payload}")]
    Protocol {
        /// The envelope's status field
        status: String,
        /// The envelope's response field, kept for diagnostics
        payload: serde_json::Value,
    },
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// True for failures at the HTTP level (no response, or a non-200 status)
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::RequestFailed(_) | Self::ApiError { .. })
    }

    /// True when the server answered 200 but did not say "ok"
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}

impl From<PollRejection> for ClientError {
    fn from(rejection: PollRejection) -> Self {
        Self::Protocol {
            status: rejection.status,
            payload: rejection.payload,
        }
    }
}
