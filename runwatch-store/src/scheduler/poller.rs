//! Run status poller
//!
//! Sends the current run identifiers to the server once after a warm-up
//! delay and then on a fixed interval, publishing each accepted response.
//! Every failure is soft: it is logged and counted, and the next tick simply
//! tries again.
//!
//! Polls may overlap (the warm-up poll can race the first interval poll, and
//! `poll_now` can run at any time). Each poll takes a sequence number and a
//! response is only published if no newer poll has published already.

use anyhow::{Context as AnyhowContext, Result};
use runwatch_client::{ApiClient, ClientError};
use runwatch_core::domain::poll::{PollResult, PollerStats, empty_result};
use runwatch_core::domain::run::RunId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::observable::{Observable, Subscription};
use crate::registry::RunIdRegistry;
use crate::repository::PollRepository;

/// What started a poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Warmup,
    Interval,
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trigger::Warmup => "warmup",
            Trigger::Interval => "interval",
            Trigger::Manual => "manual",
        })
    }
}

/// Result of a single poll cycle
#[derive(Debug)]
pub enum PollOutcome {
    /// The response was accepted and handed to subscribers
    Published(PollResult),
    /// The response was fine but a newer poll had already published
    Stale { sequence: u64 },
    /// Transport or protocol failure; nothing was published
    Failed(ClientError),
}

impl PollOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published(_))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the timer tasks and the poller handle
struct PollCycle {
    repository: Arc<dyn PollRepository>,
    runs: Arc<Mutex<Vec<RunId>>>,
    results: Observable<PollResult>,
    next_sequence: AtomicU64,
    last_published: AtomicU64,
    stats: Mutex<PollerStats>,
}

impl PollCycle {
    async fn run(&self, trigger: Trigger) -> PollOutcome {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let runs = lock(&self.runs).clone();
        lock(&self.stats).polls_started += 1;

        debug!(sequence, %trigger, runs = runs.len(), "Polling run status");

        match self.repository.poll(&runs).await {
            Ok(result) => self.publish(sequence, result),
            Err(e) => {
                match &e {
                    ClientError::Protocol { status, payload } => {
                        warn!(sequence, %status, %payload, "Server rejected run status poll");
                    }
                    _ => warn!(sequence, "Error during run status poll: {}", e),
                }

                let mut stats = lock(&self.stats);
                stats.failures += 1;
                stats.last_error = Some(e.to_string());
                PollOutcome::Failed(e)
            }
        }
    }

    fn publish(&self, sequence: u64, result: PollResult) -> PollOutcome {
        // The check runs under the observable's lock, so two polls finishing
        // together cannot publish out of order.
        let published = self.results.update(|_| {
            if sequence <= self.last_published.load(Ordering::SeqCst) {
                return None;
            }
            self.last_published.store(sequence, Ordering::SeqCst);
            Some(result.clone())
        });

        let mut stats = lock(&self.stats);
        if published {
            stats.published += 1;
            stats.last_published_at = Some(chrono::Utc::now());
            drop(stats);
            debug!(sequence, "Published run status");
            PollOutcome::Published(result)
        } else {
            stats.stale += 1;
            drop(stats);
            debug!(sequence, "Discarding stale run status response");
            PollOutcome::Stale { sequence }
        }
    }
}

/// Periodically fetches the status of the registered runs
///
/// Created with [`RunStatusPoller::start`] (or [`RunStatusPoller::connect`]),
/// which must be called from within a tokio runtime. The poller keeps a
/// mirror of the registry through a subscription, so every poll sends the
/// list as it is at that moment.
///
/// Dropping the poller shuts it down.
pub struct RunStatusPoller {
    cycle: Arc<PollCycle>,
    mirror: Option<Subscription>,
    warmup: Option<JoinHandle<()>>,
    recurring: Option<JoinHandle<()>>,
    cancel_warmup_on_shutdown: bool,
}

impl RunStatusPoller {
    /// Starts a poller over `registry` that fetches through `repository`
    ///
    /// Schedules the warm-up poll after `config.warmup_delay` and the
    /// recurring poll every `config.poll_interval`, starting one interval
    /// from now.
    pub fn start(
        registry: &RunIdRegistry,
        repository: Arc<dyn PollRepository>,
        config: &Config,
    ) -> Self {
        let runs = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&runs);
        let mirror = registry.subscribe(move |current| {
            *lock(&sink) = current.clone();
        });

        let cycle = Arc::new(PollCycle {
            repository,
            runs,
            results: Observable::new(empty_result()),
            next_sequence: AtomicU64::new(0),
            last_published: AtomicU64::new(0),
            stats: Mutex::new(PollerStats::default()),
        });

        info!(
            "Starting run status poller (warmup: {:?}, interval: {:?})",
            config.warmup_delay, config.poll_interval
        );

        let warmup = Self::spawn_warmup(Arc::clone(&cycle), config.warmup_delay);
        let recurring = Self::spawn_recurring(Arc::clone(&cycle), config.poll_interval);

        Self {
            cycle,
            mirror: Some(mirror),
            warmup: Some(warmup),
            recurring: Some(recurring),
            cancel_warmup_on_shutdown: config.cancel_warmup_on_shutdown,
        }
    }

    /// Validates `config`, builds an HTTP client for it, and starts polling
    pub fn connect(registry: &RunIdRegistry, config: &Config) -> Result<Self> {
        config.validate()?;

        let client = ApiClient::with_timeout(config.base_url.clone(), config.request_timeout)
            .context("Failed to build HTTP client")?;

        info!("Polling run status from {}", client.base_url());

        Ok(Self::start(registry, Arc::new(client), config))
    }

    /// Observable holding the last published result
    ///
    /// Starts out as an empty JSON object.
    pub fn results(&self) -> Observable<PollResult> {
        self.cycle.results.clone()
    }

    /// Subscribes to published results, replaying the current one
    pub fn subscribe(
        &self,
        callback: impl Fn(&PollResult) + Send + Sync + 'static,
    ) -> Subscription {
        self.cycle.results.subscribe(callback)
    }

    /// The last published result
    pub fn latest(&self) -> PollResult {
        self.cycle.results.get()
    }

    /// Runs one poll cycle right away, outside the timers
    pub async fn poll_now(&self) -> PollOutcome {
        self.cycle.run(Trigger::Manual).await
    }

    /// Snapshot of the poller's counters
    pub fn stats(&self) -> PollerStats {
        lock(&self.cycle.stats).clone()
    }

    /// Whether the recurring timer is still active
    pub fn is_running(&self) -> bool {
        self.recurring
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the recurring timer and detaches from the registry
    ///
    /// A warm-up poll that has not fired yet still fires once, unless the
    /// poller was configured with `cancel_warmup_on_shutdown`. Requests
    /// already in flight are not cancelled.
    pub fn shutdown(&mut self) {
        if let Some(recurring) = self.recurring.take() {
            recurring.abort();
            info!("Run status poller stopped");
        }

        let cancel_warmup = self.cancel_warmup_on_shutdown;
        if let Some(warmup) = self.warmup.take().filter(|_| cancel_warmup) {
            warmup.abort();
        }

        if let Some(mirror) = self.mirror.take() {
            mirror.unsubscribe();
        }
    }

    /// Spawns the one-shot warm-up poll
    fn spawn_warmup(cycle: Arc<PollCycle>, delay: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            time::sleep(delay).await;
            cycle.run(Trigger::Warmup).await;
        })
    }

    /// Spawns the recurring poll loop
    ///
    /// The loop awaits each poll before waiting for the next tick; ticks
    /// missed while a slow request was outstanding are skipped. The first
    /// tick is reached through `sleep`, which saturates periods too large to
    /// add to the current instant.
    fn spawn_recurring(cycle: Arc<PollCycle>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            time::sleep(period).await;
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                cycle.run(Trigger::Interval).await;
            }
        })
    }
}

impl Drop for RunStatusPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for RunStatusPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunStatusPoller")
            .field("running", &self.is_running())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::time::Instant;

    /// One scripted server answer
    enum Reply {
        Ok(PollResult),
        Rejected(PollResult),
        Status(u16),
    }

    struct Scripted {
        reply: Reply,
        delay: Duration,
    }

    /// Repository that replays scripted answers and records every call
    struct ScriptedRepository {
        started: Instant,
        script: Mutex<VecDeque<Scripted>>,
        calls: Mutex<Vec<(Duration, Vec<RunId>)>>,
    }

    impl ScriptedRepository {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                started: Instant::now(),
                script: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn push(&self, reply: Reply) {
            self.push_delayed(reply, Duration::ZERO);
        }

        fn push_delayed(&self, reply: Reply, delay: Duration) {
            self.script.lock().unwrap().push_back(Scripted { reply, delay });
        }

        fn calls(&self) -> Vec<(Duration, Vec<RunId>)> {
            self.calls.lock().unwrap().clone()
        }

        fn call_offsets(&self) -> Vec<u64> {
            self.calls().iter().map(|(at, _)| at.as_secs()).collect()
        }
    }

    #[async_trait]
    impl PollRepository for ScriptedRepository {
        async fn poll(&self, runs: &[RunId]) -> Result<PollResult, ClientError> {
            self.calls
                .lock()
                .unwrap()
                .push((self.started.elapsed(), runs.to_vec()));

            let next = self.script.lock().unwrap().pop_front();
            let Some(Scripted { reply, delay }) = next else {
                return Ok(json!({}));
            };

            if !delay.is_zero() {
                time::sleep(delay).await;
            }

            match reply {
                Reply::Ok(result) => Ok(result),
                Reply::Rejected(payload) => Err(ClientError::Protocol {
                    status: "error".to_string(),
                    payload,
                }),
                Reply::Status(status) => Err(ClientError::api_error(status, "server error")),
            }
        }
    }

    fn ids(raw: &[&str]) -> Vec<RunId> {
        raw.iter().map(|id| RunId::from(*id)).collect()
    }

    fn start(
        registry: &RunIdRegistry,
        repository: &Arc<ScriptedRepository>,
        config: &Config,
    ) -> RunStatusPoller {
        RunStatusPoller::start(registry, repository.clone(), config)
    }

    async fn advance_to(repository: &ScriptedRepository, offset: Duration) {
        let target = repository.started + offset;
        time::sleep_until(target).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_warmup_then_fixed_interval() {
        let repository = ScriptedRepository::new();
        let registry = RunIdRegistry::new();
        let _poller = start(&registry, &repository, &Config::default());

        advance_to(&repository, Duration::from_millis(9_500)).await;
        assert!(repository.calls().is_empty());

        advance_to(&repository, Duration::from_millis(10_500)).await;
        assert_eq!(repository.call_offsets(), vec![10]);

        advance_to(&repository, Duration::from_millis(60_500)).await;
        assert_eq!(repository.call_offsets(), vec![10, 20, 40, 60]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_sends_latest_registry_contents() {
        let repository = ScriptedRepository::new();
        let registry = RunIdRegistry::with_runs(ids(&["stale"]));
        let _poller = start(&registry, &repository, &Config::default());

        registry.set(ids(&["run-1", "run-2"]));
        advance_to(&repository, Duration::from_millis(10_500)).await;

        registry.set(Vec::new());
        advance_to(&repository, Duration::from_millis(20_500)).await;

        let calls = repository.calls();
        assert_eq!(calls[0].1, ids(&["run-1", "run-2"]));
        assert!(calls[1].1.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ok_response_is_published_unchanged() {
        let repository = ScriptedRepository::new();
        repository.push(Reply::Ok(json!({ "run-1": "passed" })));
        let registry = RunIdRegistry::with_runs(ids(&["run-1"]));
        let poller = start(&registry, &repository, &Config::default());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = poller.subscribe(move |result| sink.lock().unwrap().push(result.clone()));

        advance_to(&repository, Duration::from_millis(10_500)).await;

        assert_eq!(poller.latest(), json!({ "run-1": "passed" }));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![json!({}), json!({ "run-1": "passed" })]
        );
        assert_eq!(poller.stats().published, 1);
        assert!(poller.stats().last_published_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_response_keeps_previous_value() {
        let repository = ScriptedRepository::new();
        repository.push(Reply::Ok(json!({ "run-1": "running" })));
        repository.push(Reply::Rejected(json!("bad request")));
        let registry = RunIdRegistry::with_runs(ids(&["run-1"]));
        let poller = start(&registry, &repository, &Config::default());

        advance_to(&repository, Duration::from_millis(20_500)).await;

        assert_eq!(repository.calls().len(), 2);
        assert_eq!(poller.latest(), json!({ "run-1": "running" }));

        let stats = poller.stats();
        assert_eq!(stats.published, 1);
        assert_eq!(stats.failures, 1);
        assert!(stats.last_error.unwrap().contains("bad request"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_publishes_nothing_and_polling_continues() {
        let repository = ScriptedRepository::new();
        repository.push(Reply::Status(500));
        repository.push(Reply::Status(500));
        repository.push(Reply::Ok(json!({ "run-1": "failed" })));
        let registry = RunIdRegistry::with_runs(ids(&["run-1"]));
        let poller = start(&registry, &repository, &Config::default());

        let notifications = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&notifications);
        let _sub = poller.subscribe(move |_| *counter.lock().unwrap() += 1);

        advance_to(&repository, Duration::from_millis(20_500)).await;
        assert_eq!(poller.latest(), json!({}));
        assert_eq!(*notifications.lock().unwrap(), 1);
        assert!(poller.is_running());

        advance_to(&repository, Duration::from_millis(40_500)).await;
        assert_eq!(poller.latest(), json!({ "run-1": "failed" }));
        assert_eq!(poller.stats().failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_now_reports_outcome() {
        let repository = ScriptedRepository::new();
        repository.push(Reply::Rejected(json!({ "reason": "unknown run" })));
        repository.push(Reply::Ok(json!({ "run-1": "passed" })));
        let registry = RunIdRegistry::with_runs(ids(&["run-1"]));
        let poller = start(&registry, &repository, &Config::default());

        match poller.poll_now().await {
            PollOutcome::Failed(e) => assert!(e.is_protocol_error()),
            other => panic!("expected failure, got {other:?}"),
        }

        let outcome = poller.poll_now().await;
        assert!(outcome.is_published());
        assert_eq!(poller.stats().polls_started, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_response_does_not_overwrite_newer_one() {
        let repository = ScriptedRepository::new();
        repository.push_delayed(Reply::Ok(json!({ "run-1": "running" })), Duration::from_secs(5));
        repository.push(Reply::Ok(json!({ "run-1": "passed" })));
        let registry = RunIdRegistry::with_runs(ids(&["run-1"]));
        let poller = start(&registry, &repository, &Config::default());

        let (slow, fast) = tokio::join!(poller.poll_now(), async {
            time::sleep(Duration::from_secs(1)).await;
            poller.poll_now().await
        });

        assert!(fast.is_published());
        assert!(matches!(slow, PollOutcome::Stale { sequence: 1 }));
        assert_eq!(poller.latest(), json!({ "run-1": "passed" }));
        assert_eq!(poller.stats().stale, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_recurring_polls() {
        let repository = ScriptedRepository::new();
        let registry = RunIdRegistry::new();
        let mut poller = start(&registry, &repository, &Config::default());

        advance_to(&repository, Duration::from_millis(20_500)).await;
        poller.shutdown();
        assert!(!poller.is_running());

        advance_to(&repository, Duration::from_secs(120)).await;
        assert_eq!(repository.call_offsets(), vec![10, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warmup_survives_early_shutdown_by_default() {
        let repository = ScriptedRepository::new();
        repository.push(Reply::Ok(json!({ "run-1": "passed" })));
        let registry = RunIdRegistry::with_runs(ids(&["run-1"]));
        let mut poller = start(&registry, &repository, &Config::default());
        let results = poller.results();

        advance_to(&repository, Duration::from_secs(3)).await;
        poller.shutdown();

        advance_to(&repository, Duration::from_secs(90)).await;
        assert_eq!(repository.call_offsets(), vec![10]);
        assert_eq!(results.get(), json!({ "run-1": "passed" }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_warmup_can_be_cancelled_on_shutdown() {
        let repository = ScriptedRepository::new();
        let registry = RunIdRegistry::new();
        let mut config = Config::default();
        config.cancel_warmup_on_shutdown = true;
        let mut poller = start(&registry, &repository, &config);

        advance_to(&repository, Duration::from_secs(3)).await;
        poller.shutdown();

        advance_to(&repository, Duration::from_secs(90)).await;
        assert!(repository.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_shuts_down() {
        let repository = ScriptedRepository::new();
        let registry = RunIdRegistry::new();
        let mut config = Config::default();
        config.cancel_warmup_on_shutdown = true;
        drop(start(&registry, &repository, &config));

        advance_to(&repository, Duration::from_secs(90)).await;
        assert!(repository.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_timings() {
        let repository = ScriptedRepository::new();
        let registry = RunIdRegistry::new();
        let config = Config::default()
            .with_warmup_delay(Duration::from_secs(1))
            .with_poll_interval(Duration::from_secs(5));
        let _poller = start(&registry, &repository, &config);

        advance_to(&repository, Duration::from_millis(15_500)).await;
        assert_eq!(repository.call_offsets(), vec![1, 5, 10, 15]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_interval_keeps_timer_alive() {
        let repository = ScriptedRepository::new();
        repository.push(Reply::Ok(json!({ "run-1": "queued" })));
        let registry = RunIdRegistry::with_runs(ids(&["run-1"]));
        let config = Config::default()
            .with_warmup_delay(Duration::from_secs(u64::MAX))
            .with_poll_interval(Duration::from_secs(u64::MAX));
        let poller = start(&registry, &repository, &config);

        advance_to(&repository, Duration::from_secs(3_600)).await;
        assert!(poller.is_running());
        assert!(repository.calls().is_empty());

        let outcome = poller.poll_now().await;
        assert!(outcome.is_published());
        assert_eq!(poller.latest(), json!({ "run-1": "queued" }));
        assert!(poller.is_running());
    }

    #[test]
    fn test_connect_rejects_invalid_config() {
        let registry = RunIdRegistry::new();
        let config = Config::new("not-a-url");
        assert!(RunStatusPoller::connect(&registry, &config).is_err());
    }
}
