//! Duplicate call suppression.
//!
//! A [`Flight`] guarantees that for any key, at most one execution of the
//! keyed closure is in flight at a time. Callers that arrive while an
//! execution is running block until it completes and receive a clone of
//! the same outcome: successes and failures alike, since the outcome
//! type is whatever `Result` the caller chooses. Once the execution
//! finishes and its waiters drain, the key is forgotten; the next call
//! with that key runs fresh.

mod flight;

pub use flight::Flight;
