//! Shared fixtures for group tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;

use crate::{Error, Fetcher, Group, GroupConfig, Loader, PeerPicker, Sink};

/// Loader producing `"value-for-<key>"`, counting its invocations.
pub struct CountingLoader {
    pub calls: Arc<AtomicUsize>,
    pub delay: Duration,
}

impl CountingLoader {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            delay,
        }
    }
}

impl Loader for CountingLoader {
    fn load(&self, _group: &str, key: &str, sink: &mut dyn Sink) -> Result<(), Error> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        sink.set_string(&format!("value-for-{key}"))
    }
}

/// Loader that always fails.
pub struct FailingLoader;

impl Loader for FailingLoader {
    fn load(&self, _group: &str, key: &str, _sink: &mut dyn Sink) -> Result<(), Error> {
        Err(Error::Loader(format!("no value for {key}")))
    }
}

/// Fetcher producing `"peer-value-for-<key>"`, counting its invocations.
pub struct CountingFetcher {
    pub calls: Arc<AtomicUsize>,
}

impl CountingFetcher {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Fetcher for CountingFetcher {
    fn fetch(&self, _group: &str, key: &str) -> Result<Bytes, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::from(format!("peer-value-for-{key}")))
    }
}

/// Fetcher that always fails.
pub struct FailingFetcher;

impl Fetcher for FailingFetcher {
    fn fetch(&self, _group: &str, _key: &str) -> Result<Bytes, Error> {
        Err(Error::PeerFetch("peer unreachable".to_string()))
    }
}

/// Picker that routes every key to one remote fetcher.
pub struct AlwaysRemote(pub Arc<dyn Fetcher>);

impl PeerPicker for AlwaysRemote {
    fn pick_peer(&self, _key: &str) -> Option<Arc<dyn Fetcher>> {
        Some(Arc::clone(&self.0))
    }
}

/// A group with the given byte budget and a counting loader.
pub fn counting_group(cache_bytes: u64) -> (Group, Arc<AtomicUsize>) {
    let loader = CountingLoader::new();
    let calls = Arc::clone(&loader.calls);
    let group = Group::new(
        GroupConfig {
            name: "test".to_string(),
            cache_bytes,
        },
        loader,
    );
    (group, calls)
}
