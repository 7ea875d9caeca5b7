//! Runwatch Store
//!
//! Client-side state for tracking test runs:
//! - [`RunIdRegistry`]: the observable list of run identifiers the caller
//!   cares about, replaced wholesale
//! - [`RunStatusPoller`]: polls the server for those runs after a warm-up
//!   delay and then on a fixed interval, publishing each accepted response
//!   to an observable
//!
//! Both are built on [`Observable`], a value holder with synchronous change
//! notification and current-value replay.
//!
//! # Example
//!
//! ```no_run
//! use runwatch_core::domain::run::RunId;
//! use runwatch_store::{Config, RunIdRegistry, RunStatusPoller};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = RunIdRegistry::new();
//!     let poller = RunStatusPoller::connect(&registry, &Config::new("http://localhost:5000"))?;
//!
//!     let _sub = poller.subscribe(|statuses| println!("{statuses}"));
//!     registry.set(vec![RunId::from("run-1")]);
//!
//!     tokio::signal::ctrl_c().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod observable;
pub mod registry;
pub mod repository;
pub mod scheduler;

pub use config::Config;
pub use observable::{Observable, Subscription};
pub use registry::RunIdRegistry;
pub use repository::PollRepository;
pub use scheduler::{PollOutcome, RunStatusPoller};
