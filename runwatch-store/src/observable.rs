//! Observable value container
//!
//! A value holder that notifies registered callbacks synchronously on every
//! change and replays the current value to each new subscriber.
//!
//! All deliveries for one observable go through a single drain loop. The
//! caller that publishes while nobody is delivering runs the loop; a caller
//! that publishes while a delivery is in progress (another thread, or a
//! callback writing back) only stores the new value, and the running loop
//! hands it out before it stops. Each subscriber remembers the newest version
//! it was given, so it never sees an older value after a newer one.
//!
//! Callbacks run outside the internal lock, so a callback may read or write
//! the observable it is subscribed to.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Subscriber<T> {
    id: u64,
    seen: u64,
    callback: Callback<T>,
}

struct State<T> {
    value: T,
    version: u64,
    next_id: u64,
    draining: bool,
    subscribers: Vec<Subscriber<T>>,
}

fn lock<T>(state: &Mutex<State<T>>) -> MutexGuard<'_, State<T>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the `draining` flag if a callback panics mid-delivery
struct DrainGuard<'a, T> {
    state: &'a Mutex<State<T>>,
    armed: bool,
}

impl<T> Drop for DrainGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.state).draining = false;
        }
    }
}

/// Shared, cloneable observable value
///
/// Clones share the same value and subscriber list.
pub struct Observable<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Default + Clone + Send + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send + 'static> Observable<T> {
    /// Creates an observable holding `initial`
    pub fn new(initial: T) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                value: initial,
                version: 1,
                next_id: 0,
                draining: false,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Returns a clone of the current value
    pub fn get(&self) -> T {
        lock(&self.state).value.clone()
    }

    /// Runs `f` against the current value without cloning it
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&lock(&self.state).value)
    }

    /// Replaces the value and notifies every current subscriber
    ///
    /// Notification happens before returning unless a delivery is already
    /// running, in which case that delivery hands out the new value.
    pub fn set(&self, value: T) {
        let drain = {
            let mut state = lock(&self.state);
            state.value = value;
            state.version += 1;
            Self::claim_drain(&mut state)
        };

        if drain {
            self.drain();
        }
    }

    /// Computes a replacement from the current value and publishes it
    ///
    /// `f` runs under the lock, so concurrent updates do not lose each
    /// other's changes. Returning `None` leaves the value untouched and
    /// notifies nobody. Returns whether a new value was published.
    pub fn update(&self, f: impl FnOnce(&T) -> Option<T>) -> bool {
        let drain = {
            let mut state = lock(&self.state);
            match f(&state.value) {
                Some(next) => {
                    state.value = next;
                    state.version += 1;
                    Some(Self::claim_drain(&mut state))
                }
                None => None,
            }
        };

        match drain {
            Some(drain) => {
                if drain {
                    self.drain();
                }
                true
            }
            None => false,
        }
    }

    /// Registers `callback`, invokes it with the current value, and returns
    /// the handle that removes it again
    ///
    /// The replay happens before returning unless a delivery is already
    /// running, which then includes the new callback. The callback stays
    /// registered until [`Subscription::unsubscribe`] is called; dropping the
    /// handle does not unsubscribe.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let (id, drain) = {
            let mut state = lock(&self.state);
            let id = state.next_id;
            state.next_id += 1;

            state.subscribers.push(Subscriber {
                id,
                seen: 0,
                callback: Arc::new(callback),
            });
            (id, Self::claim_drain(&mut state))
        };

        if drain {
            self.drain();
        }

        let weak: Weak<Mutex<State<T>>> = Arc::downgrade(&self.state);
        Subscription {
            remove: Some(Box::new(move || {
                if let Some(state) = weak.upgrade() {
                    lock(&state).subscribers.retain(|s| s.id != id);
                }
            })),
        }
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).subscribers.len()
    }

    /// Marks the caller as the drainer if no delivery is running
    fn claim_drain(state: &mut State<T>) -> bool {
        if state.draining {
            false
        } else {
            state.draining = true;
            true
        }
    }

    /// Delivers the latest value to every subscriber behind it, until none is
    fn drain(&self) {
        let mut guard = DrainGuard {
            state: &self.state,
            armed: true,
        };

        loop {
            let (value, targets) = {
                let mut state = lock(&self.state);
                let version = state.version;
                let targets: Vec<Callback<T>> = state
                    .subscribers
                    .iter_mut()
                    .filter(|s| s.seen < version)
                    .map(|s| {
                        s.seen = version;
                        Arc::clone(&s.callback)
                    })
                    .collect();

                if targets.is_empty() {
                    state.draining = false;
                    guard.armed = false;
                    return;
                }
                (state.value.clone(), targets)
            };

            for callback in &targets {
                callback(&value);
            }
        }
    }
}

impl<T: Clone + Send + std::fmt::Debug + 'static> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("Observable")
            .field("value", &state.value)
            .field("version", &state.version)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

/// Handle for a registered callback
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Subscription {
    remove: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Removes the callback; it will not be invoked again
    pub fn unsubscribe(mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
