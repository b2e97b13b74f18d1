//! Peer interfaces: who owns a key, and how to ask them for it.
//!
//! The transport between peers is out of scope: HTTP, RPC, or in-process
//! calls all fit behind [`Fetcher`]. The cache only needs an ownership
//! oracle ([`PeerPicker`]) and a way to ask the owner for bytes.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use reef_ring::Ring;
use tracing::info;

use crate::error::Error;

/// Client handle for one remote peer.
pub trait Fetcher: Send + Sync {
    /// Fetch the cached value for `key` in group `group` from this peer.
    ///
    /// Failures surface as [`Error::PeerFetch`]; the cache never retries
    /// a fetch.
    fn fetch(&self, group: &str, key: &str) -> Result<Bytes, Error>;
}

/// Decides which peer owns a key.
pub trait PeerPicker: Send + Sync {
    /// Return the owner's client, or `None` when the local peer owns `key`.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn Fetcher>>;
}

/// Picker for a cluster of one: every key is owned locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPeers;

impl PeerPicker for NoPeers {
    fn pick_peer(&self, _key: &str) -> Option<Arc<dyn Fetcher>> {
        None
    }
}

/// Default [`PeerPicker`]: a consistent-hash ring over named peers.
///
/// Membership changes replace the whole peer set; the ring is rebuilt
/// under a write lock, which serializes the rebuild against concurrent
/// owner lookups.
pub struct RingPicker {
    self_id: String,
    replicas: usize,
    state: RwLock<PickerState>,
}

struct PickerState {
    ring: Ring,
    fetchers: HashMap<String, Arc<dyn Fetcher>>,
}

impl RingPicker {
    /// Virtual points per peer. Enough to keep the key-space split within
    /// a few percent of even for small clusters.
    pub const DEFAULT_REPLICAS: usize = 50;

    /// Create a picker for the peer named `self_id` with an empty peer set.
    ///
    /// Until [`set_peers`](RingPicker::set_peers) is called, every key is
    /// owned locally.
    pub fn new(self_id: impl Into<String>) -> Self {
        Self::with_replicas(self_id, Self::DEFAULT_REPLICAS)
    }

    /// Create a picker with a custom virtual-point count per peer.
    pub fn with_replicas(self_id: impl Into<String>, replicas: usize) -> Self {
        Self {
            self_id: self_id.into(),
            replicas,
            state: RwLock::new(PickerState {
                ring: Ring::new(replicas),
                fetchers: HashMap::new(),
            }),
        }
    }

    /// Replace the full peer set.
    ///
    /// Include every cluster member, the local peer among them. The
    /// local peer's fetcher is never called, but its identity must sit on
    /// the ring for ownership to be distributed correctly.
    pub fn set_peers<I>(&self, peers: I)
    where
        I: IntoIterator<Item = (String, Arc<dyn Fetcher>)>,
    {
        let mut ring = Ring::new(self.replicas);
        let mut fetchers = HashMap::new();
        for (id, fetcher) in peers {
            ring.add([id.clone()]);
            fetchers.insert(id, fetcher);
        }

        let mut state = self.state.write().expect("picker lock poisoned");
        state.ring = ring;
        state.fetchers = fetchers;
        info!(self_id = %self.self_id, peers = state.fetchers.len(), "peer set replaced");
    }

    /// The local peer's identity.
    pub fn self_id(&self) -> &str {
        &self.self_id
    }
}

impl PeerPicker for RingPicker {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn Fetcher>> {
        let state = self.state.read().expect("picker lock poisoned");
        let owner = state.ring.get(key)?;
        if owner == self.self_id {
            return None;
        }
        state.fetchers.get(owner).cloned()
    }
}
