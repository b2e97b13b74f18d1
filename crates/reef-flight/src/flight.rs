//! Single-flight coordinator implementation.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

use tracing::trace;

/// An in-flight or completed keyed execution.
///
/// The outcome slot is written exactly once, before the condvar
/// broadcast, so a woken waiter always observes it. The record is held
/// through an `Arc` and may outlive its map entry while late waiters
/// read the outcome.
struct Call<T> {
    outcome: Mutex<Option<T>>,
    done: Condvar,
}

impl<T: Clone> Call<T> {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    /// Block until the outcome is published, then clone it.
    fn wait(&self) -> T {
        let mut outcome = self.outcome.lock().expect("flight call lock poisoned");
        loop {
            if let Some(value) = outcome.as_ref() {
                return value.clone();
            }
            outcome = self.done.wait(outcome).expect("flight call lock poisoned");
        }
    }

    /// Publish the outcome and release every waiter.
    fn finish(&self, value: T) {
        let mut outcome = self.outcome.lock().expect("flight call lock poisoned");
        *outcome = Some(value);
        self.done.notify_all();
    }
}

/// Suppresses duplicate concurrent executions per key.
///
/// `T` is the shared outcome (typically a `Result`) and must be `Clone`
/// so every waiter can take a copy.
pub struct Flight<T> {
    calls: Mutex<HashMap<String, Arc<Call<T>>>>,
}

impl<T: Clone> Flight<T> {
    /// Create a coordinator with no calls in flight.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Run `f` for `key`, unless an execution for `key` is already in
    /// flight; then block until it completes and return its outcome.
    ///
    /// The map lock is never held while `f` runs; different keys proceed
    /// independently. `f` is never retried: whatever it returns, success
    /// or failure, is what every overlapping caller gets.
    pub fn call<F>(&self, key: &str, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let call = {
            let mut calls = self.calls.lock().expect("flight map lock poisoned");
            if let Some(existing) = calls.get(key) {
                let existing = Arc::clone(existing);
                drop(calls);
                trace!(key, "joining in-flight call");
                return existing.wait();
            }
            let call = Arc::new(Call::new());
            calls.insert(key.to_owned(), Arc::clone(&call));
            call
        };

        let outcome = f();
        call.finish(outcome.clone());

        self.calls
            .lock()
            .expect("flight map lock poisoned")
            .remove(key);

        outcome
    }
}

impl<T: Clone> Default for Flight<T> {
    fn default() -> Self {
        Self::new()
    }
}
