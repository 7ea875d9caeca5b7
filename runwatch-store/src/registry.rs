//! Run identifier registry
//!
//! Holds the identifiers of the runs the client currently cares about. UI
//! code replaces the list wholesale; the poller mirrors it through a
//! subscription so every poll sends the freshest list.

use runwatch_core::domain::run::RunId;

use crate::observable::{Observable, Subscription};

/// Observable list of run identifiers
///
/// Cheap to clone; clones share the same list and subscribers.
#[derive(Debug, Clone, Default)]
pub struct RunIdRegistry {
    runs: Observable<Vec<RunId>>,
}

impl RunIdRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry seeded with `runs`
    pub fn with_runs(runs: impl IntoIterator<Item = RunId>) -> Self {
        Self {
            runs: Observable::new(runs.into_iter().collect()),
        }
    }

    /// Replaces the whole list and notifies every subscriber
    ///
    /// Empty lists and duplicates are accepted as given.
    pub fn set(&self, runs: Vec<RunId>) {
        self.runs.set(runs);
    }

    /// Registers `callback`, replays the current list to it, and returns the
    /// handle that removes it
    pub fn subscribe(
        &self,
        callback: impl Fn(&Vec<RunId>) + Send + Sync + 'static,
    ) -> Subscription {
        self.runs.subscribe(callback)
    }

    /// Returns a snapshot of the current list
    pub fn get(&self) -> Vec<RunId> {
        self.runs.get()
    }

    /// Appends `run` unless it is already tracked
    ///
    /// Returns whether the list changed.
    pub fn add(&self, run: RunId) -> bool {
        self.runs.update(|current| {
            if current.contains(&run) {
                return None;
            }
            let mut next = current.clone();
            next.push(run);
            Some(next)
        })
    }

    /// Drops every occurrence of `run`
    ///
    /// Returns whether the list changed.
    pub fn remove(&self, run: &RunId) -> bool {
        self.runs.update(|current| {
            if !current.contains(run) {
                return None;
            }
            Some(current.iter().filter(|r| *r != run).cloned().collect())
        })
    }

    /// Number of identifiers, duplicates included
    pub fn len(&self) -> usize {
        self.runs.read(|runs| runs.len())
    }

    /// Whether the list holds no identifiers
    pub fn is_empty(&self) -> bool {
        self.runs.read(|runs| runs.is_empty())
    }
}
