//! Group: a namespace of cached keys spread across peers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use rand::Rng;
use reef_flight::Flight;
use tracing::{trace, warn};

use crate::byteview::ByteView;
use crate::cache::{ByteCache, CacheStats};
use crate::error::Error;
use crate::peers::{Fetcher, NoPeers, PeerPicker};
use crate::sink::{Sink, ViewSink};

/// Default combined byte budget for a group's tiers: 64 MB.
const DEFAULT_CACHE_BYTES: u64 = 64 << 20;

/// The hot tier's share of the budget: it is evicted first once it holds
/// more than 1/8 of what the main tier does. Keeps most of the locality
/// benefit of caching other peers' keys with bounded memory.
const HOT_TIER_DIVISOR: u64 = 8;

/// One in this many successful peer fetches lands in the hot tier.
const HOT_ADMIT_ONE_IN: u32 = 10;

/// Fills misses for keys this peer owns.
///
/// A loader writes the value through the sink at least once on success;
/// its errors reach the `get` caller (and every concurrent duplicate of
/// that get). Implemented for plain closures.
pub trait Loader: Send + Sync {
    /// Produce the value for `key` in group `group`, writing it to `sink`.
    fn load(&self, group: &str, key: &str, sink: &mut dyn Sink) -> Result<(), Error>;
}

impl<F> Loader for F
where
    F: Fn(&str, &str, &mut dyn Sink) -> Result<(), Error> + Send + Sync,
{
    fn load(&self, group: &str, key: &str, sink: &mut dyn Sink) -> Result<(), Error> {
        self(group, key, sink)
    }
}

/// Which tier of a group to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Keys this peer owns.
    Main,
    /// Sampled keys owned by other peers.
    Hot,
}

/// Configuration for creating a [`Group`].
pub struct GroupConfig {
    /// Group name, echoed to loaders and fetchers so one transport can
    /// multiplex several groups.
    pub name: String,
    /// Combined byte budget for the main and hot tiers. Zero disables
    /// caching entirely; every get runs the fill path.
    pub cache_bytes: u64,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            cache_bytes: DEFAULT_CACHE_BYTES,
        }
    }
}

/// Per-group counters. All atomic; readable at any time.
#[derive(Debug, Default)]
pub struct Stats {
    /// Gets served, any outcome.
    pub gets: AtomicU64,
    /// Gets answered from either tier.
    pub cache_hits: AtomicU64,
    /// Fills answered by a remote peer.
    pub peer_loads: AtomicU64,
    /// Remote fetches that failed (each falls back to a local load).
    pub peer_errors: AtomicU64,
    /// Fill-path entries (deduplicated gets), any origin.
    pub loads: AtomicU64,
    /// Fills served by the local loader.
    pub local_loads: AtomicU64,
    /// Local loader failures.
    pub local_load_errs: AtomicU64,
    /// Fetches served to other peers via [`Group::serve_request`].
    pub server_requests: AtomicU64,
}

/// Both tiers live under one lock so eviction can weigh them together.
struct Tiers {
    main: ByteCache,
    hot: ByteCache,
}

/// A group of cached keys sharded across a peer cluster.
///
/// On a miss the group asks its [`PeerPicker`] who owns the key: remote
/// owners are queried through their [`Fetcher`], local keys go to the
/// [`Loader`]. Either way the fill runs under a single-flight coordinator,
/// so a thundering herd on one key does the work once.
pub struct Group {
    name: String,
    cache_bytes: u64,
    loader: Box<dyn Loader>,
    peers: Arc<dyn PeerPicker>,
    tiers: Mutex<Tiers>,
    flight: Flight<Result<ByteView, Error>>,
    stats: Stats,
}

impl Group {
    /// Create a group with no peers; every key is loaded locally.
    pub fn new(config: GroupConfig, loader: impl Loader + 'static) -> Self {
        Self {
            name: config.name,
            cache_bytes: config.cache_bytes,
            loader: Box::new(loader),
            peers: Arc::new(NoPeers),
            tiers: Mutex::new(Tiers {
                main: ByteCache::new(),
                hot: ByteCache::new(),
            }),
            flight: Flight::new(),
            stats: Stats::default(),
        }
    }

    /// Set the ownership oracle for distributed operation.
    pub fn with_peers(mut self, peers: Arc<dyn PeerPicker>) -> Self {
        self.peers = peers;
        self
    }

    /// The group's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The group's counters.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Snapshot one tier's counters.
    pub fn cache_stats(&self, tier: Tier) -> CacheStats {
        let tiers = self.tiers.lock().expect("tier lock poisoned");
        match tier {
            Tier::Main => tiers.main.stats(),
            Tier::Hot => tiers.hot.stats(),
        }
    }

    /// Get the value for `key`, populating `sink` with it.
    ///
    /// Cache hits take the sink's zero-copy path where it has one. On a
    /// miss the fill runs deduplicated: overlapping gets for the same key
    /// share one load and one outcome, errors included.
    pub fn get(&self, key: &str, sink: &mut dyn Sink) -> Result<(), Error> {
        self.stats.gets.fetch_add(1, Ordering::Relaxed);

        if let Some(value) = self.lookup_cache(key) {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            trace!(group = %self.name, key, "cache hit");
            return sink.set_view(value);
        }

        let value = self.load(key)?;
        sink.set_view(value)
    }

    /// Serve a remote peer's fetch for `key`.
    ///
    /// Transport handlers adapting the serving side of [`Fetcher`] call
    /// this; it runs the same lookup-or-fill as [`get`](Group::get) and
    /// counts the request.
    pub fn serve_request(&self, key: &str) -> Result<Bytes, Error> {
        self.stats.server_requests.fetch_add(1, Ordering::Relaxed);
        let mut dst = ByteView::default();
        {
            let mut sink = ViewSink::new(&mut dst);
            self.get(key, &mut sink)?;
        }
        Ok(dst.into_bytes())
    }

    /// Run the deduplicated fill path for `key`.
    fn load(&self, key: &str) -> Result<ByteView, Error> {
        self.stats.loads.fetch_add(1, Ordering::Relaxed);
        self.flight.call(key, || {
            // A duplicate get can lose the race into the flight map after
            // the winner already populated the cache: first-probe misses,
            // winner fills and forgets the key, then this caller starts a
            // fresh flight. Re-probing keeps that window from doubling
            // the load.
            if let Some(value) = self.lookup_cache(key) {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(value);
            }

            if let Some(peer) = self.peers.pick_peer(key) {
                match self.load_from_peer(peer.as_ref(), key) {
                    Ok(value) => {
                        self.stats.peer_loads.fetch_add(1, Ordering::Relaxed);
                        return Ok(value);
                    }
                    Err(err) => {
                        self.stats.peer_errors.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            group = %self.name,
                            key,
                            %err,
                            "peer fetch failed, loading locally"
                        );
                    }
                }
            }

            self.load_locally(key)
        })
    }

    /// Ask the owning peer for the value; sometimes keep a hot copy.
    fn load_from_peer(&self, peer: &dyn Fetcher, key: &str) -> Result<ByteView, Error> {
        let bytes = peer.fetch(&self.name, key)?;
        let value = ByteView::from(bytes);

        // Admit a sample of remotely-owned keys into the hot tier.
        if rand::thread_rng().gen_range(0..HOT_ADMIT_ONE_IN) == 0 {
            self.populate_cache(key, value.clone(), Tier::Hot);
        }
        Ok(value)
    }

    /// Fill through the user loader and keep the result in the main tier.
    fn load_locally(&self, key: &str) -> Result<ByteView, Error> {
        let mut dst = ByteView::default();
        let mut sink = ViewSink::new(&mut dst);
        match self.loader.load(&self.name, key, &mut sink) {
            Ok(()) => {
                let value = sink.view();
                self.stats.local_loads.fetch_add(1, Ordering::Relaxed);
                trace!(group = %self.name, key, len = value.len(), "loaded locally");
                self.populate_cache(key, value.clone(), Tier::Main);
                Ok(value)
            }
            Err(err) => {
                self.stats.local_load_errs.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    /// Probe both tiers under the group lock.
    fn lookup_cache(&self, key: &str) -> Option<ByteView> {
        if self.cache_bytes == 0 {
            return None;
        }
        let mut tiers = self.tiers.lock().expect("tier lock poisoned");
        if let Some(value) = tiers.main.get(key) {
            return Some(value);
        }
        tiers.hot.get(key)
    }

    /// Insert into a tier, then evict until the combined footprint fits
    /// the budget. The tier holding the larger byte share pays, with the
    /// hot tier capped at 1/8 of main.
    fn populate_cache(&self, key: &str, value: ByteView, tier: Tier) {
        if self.cache_bytes == 0 {
            return;
        }
        let mut tiers = self.tiers.lock().expect("tier lock poisoned");
        match tier {
            Tier::Main => tiers.main.add(key.to_owned(), value),
            Tier::Hot => tiers.hot.add(key.to_owned(), value),
        }

        loop {
            let main_bytes = tiers.main.bytes();
            let hot_bytes = tiers.hot.bytes();
            if main_bytes + hot_bytes <= self.cache_bytes {
                return;
            }

            let victim = if hot_bytes > main_bytes / HOT_TIER_DIVISOR {
                &mut tiers.hot
            } else {
                &mut tiers.main
            };
            if victim.remove_oldest().is_none() {
                return;
            }
        }
    }
}
