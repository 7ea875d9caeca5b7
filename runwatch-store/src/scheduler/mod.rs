//! Scheduler layer
//!
//! Drives the status poller: a one-shot warm-up poll followed by a recurring
//! poll, each publishing accepted responses to subscribers.

pub mod poller;

pub use poller::{PollOutcome, RunStatusPoller};
