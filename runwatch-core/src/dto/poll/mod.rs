//! Poll DTOs
//!
//! `POST /api/v1/test_run/poll` takes `{"runs": [...]}` and answers with
//! `{"status": "...", "response": ...}`.

use serde::{Deserialize, Serialize};

use crate::domain::poll::PollResult;
use crate::domain::run::RunId;

/// Path of the batch poll endpoint, relative to the server base URL
pub const POLL_PATH: &str = "/api/v1/test_run/poll";

/// Envelope status that marks a usable response
pub const STATUS_OK: &str = "ok";

/// Request body for a batch poll
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollRequest {
    /// Identifiers whose status is requested
    pub runs: Vec<RunId>,
}

impl PollRequest {
    pub fn new(runs: &[RunId]) -> Self {
        Self {
            runs: runs.to_vec(),
        }
    }
}

/// Response envelope returned by the poll endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollEnvelope {
    /// `"ok"` on success, anything else is a rejection
    pub status: String,

    /// The status payload, or a diagnostic when `status` is not `"ok"`
    #[serde(default)]
    pub response: serde_json::Value,
}

/// A well-formed envelope whose status was not `"ok"`
#[derive(Debug, Clone, PartialEq)]
pub struct PollRejection {
    pub status: String,
    pub payload: serde_json::Value,
}

impl PollEnvelope {
    /// Builds a successful envelope around a result
    pub fn ok(response: PollResult) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            response,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Splits the envelope into the published result or the rejection
    pub fn into_result(self) -> Result<PollResult, PollRejection> {
        if self.is_ok() {
            Ok(self.response)
        } else {
            Err(PollRejection {
                status: self.status,
                payload: self.response,
            })
        }
    }
}
