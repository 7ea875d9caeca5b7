//! Repository layer
//!
//! The poller reaches the server only through [`PollRepository`], so tests
//! can drive it with a scripted source instead of a live endpoint.

mod poll;

pub use poll::PollRepository;
