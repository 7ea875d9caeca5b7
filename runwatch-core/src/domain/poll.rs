//! Poll domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status payload returned by the server for a batch of runs
///
/// The shape is owned by the server; the client forwards it untouched.
pub type PollResult = serde_json::Value;

/// The value published before the first successful poll
pub fn empty_result() -> PollResult {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Counters describing a poller's activity so far
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollerStats {
    /// Poll cycles started, whether timer-driven or manual
    pub polls_started: u64,

    /// Responses that were published to subscribers
    pub published: u64,

    /// Cycles that ended in a soft failure
    pub failures: u64,

    /// Successful responses discarded because a newer one was already published
    pub stale: u64,

    /// When the last result was published
    pub last_published_at: Option<DateTime<Utc>>,

    /// Description of the most recent soft failure
    pub last_error: Option<String>,
}
