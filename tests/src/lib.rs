//! Shared test harness for reef integration tests.
//!
//! Provides [`TestCluster`]: an N-peer cluster of [`Group`]s wired
//! together by in-process fetchers, with failure injection. Each peer has
//! its own group, tiers, and ring picker; "remote" fetches are direct
//! calls into the target group's serving path, so the full
//! ring → fetch → single-flight → tier pipeline runs without a network.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use reef_cache::{
    Error, Fetcher, Group, GroupConfig, Loader, PeerPicker, RingPicker, Sink, StringSink,
};
use reef_ring::Ring;

/// In-process fetcher: a "remote" call lands on the target group's
/// serving path. Peers in the `down` set are unreachable.
struct ClusterFetcher {
    target: Arc<Group>,
    target_id: String,
    down: Arc<RwLock<HashSet<String>>>,
}

impl Fetcher for ClusterFetcher {
    fn fetch(&self, _group: &str, key: &str) -> Result<Bytes, Error> {
        if self
            .down
            .read()
            .expect("down set lock poisoned")
            .contains(&self.target_id)
        {
            return Err(Error::PeerFetch(format!("{} is down", self.target_id)));
        }
        self.target.serve_request(key)
    }
}

/// A simulated N-peer cluster.
pub struct TestCluster {
    groups: Vec<Arc<Group>>,
    ids: Vec<String>,
    down: Arc<RwLock<HashSet<String>>>,
    /// Every `(peer, key)` the default loader ran for, in order. Empty
    /// for clusters built with a custom loader.
    loads: Arc<Mutex<Vec<(String, String)>>>,
    /// Mirror of the pickers' ring, for computing expected owners.
    ring: Ring,
}

impl TestCluster {
    /// Create an N-peer cluster with the given per-group byte budget.
    ///
    /// The default loader answers `"value-for-<key>"` and records which
    /// peer it ran on (see [`loads`](TestCluster::loads)).
    pub fn new(n: usize, cache_bytes: u64) -> Self {
        Self::with_load_delay(n, cache_bytes, Duration::ZERO)
    }

    /// Like [`new`](TestCluster::new), but loaders sleep before producing
    /// a value, giving concurrent gets a long fill to pile up on.
    pub fn with_load_delay(n: usize, cache_bytes: u64, delay: Duration) -> Self {
        let loads: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&loads);

        let mut cluster = Self::build(n, cache_bytes, move |peer_id: String| {
            let log = Arc::clone(&log);
            move |_group: &str, key: &str, sink: &mut dyn Sink| {
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                log.lock()
                    .expect("load log lock poisoned")
                    .push((peer_id.clone(), key.to_string()));
                sink.set_string(&format!("value-for-{key}"))
            }
        });
        cluster.loads = loads;
        cluster
    }

    /// Create a cluster whose peers all run the given loader.
    pub fn new_with_loader<L>(n: usize, cache_bytes: u64, loader: L) -> Self
    where
        L: Fn(&str, &str, &mut dyn Sink) -> Result<(), Error> + Send + Sync + 'static,
    {
        let shared = Arc::new(loader);
        Self::build(n, cache_bytes, move |_peer_id: String| {
            let shared = Arc::clone(&shared);
            move |group: &str, key: &str, sink: &mut dyn Sink| (*shared)(group, key, sink)
        })
    }

    fn build<F, L>(n: usize, cache_bytes: u64, make_loader: F) -> Self
    where
        F: Fn(String) -> L,
        L: Loader + 'static,
    {
        let ids: Vec<String> = (1..=n).map(|i| format!("peer-{i}")).collect();
        let down: Arc<RwLock<HashSet<String>>> = Arc::new(RwLock::new(HashSet::new()));

        let pickers: Vec<Arc<RingPicker>> = ids
            .iter()
            .map(|id| Arc::new(RingPicker::new(id.clone())))
            .collect();

        let groups: Vec<Arc<Group>> = ids
            .iter()
            .zip(&pickers)
            .map(|(id, picker)| {
                Arc::new(
                    Group::new(
                        GroupConfig {
                            name: "cluster-test".to_string(),
                            cache_bytes,
                        },
                        make_loader(id.clone()),
                    )
                    .with_peers(Arc::clone(picker) as Arc<dyn PeerPicker>),
                )
            })
            .collect();

        for picker in &pickers {
            picker.set_peers(ids.iter().zip(&groups).map(|(id, group)| {
                let fetcher: Arc<dyn Fetcher> = Arc::new(ClusterFetcher {
                    target: Arc::clone(group),
                    target_id: id.clone(),
                    down: Arc::clone(&down),
                });
                (id.clone(), fetcher)
            }));
        }

        let mut ring = Ring::new(RingPicker::DEFAULT_REPLICAS);
        ring.add(ids.iter().cloned());

        Self {
            groups,
            ids,
            down,
            loads: Arc::new(Mutex::new(Vec::new())),
            ring,
        }
    }

    /// Number of peers.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the cluster has no peers.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The group running on peer `i`.
    pub fn group(&self, i: usize) -> &Arc<Group> {
        &self.groups[i]
    }

    /// The identity of peer `i`.
    pub fn id(&self, i: usize) -> &str {
        &self.ids[i]
    }

    /// Which peer the ring assigns `key` to.
    pub fn owner_of(&self, key: &str) -> &str {
        self.ring.get(key).expect("non-empty ring")
    }

    /// Index of the peer owning `key`.
    pub fn owner_index(&self, key: &str) -> usize {
        let owner = self.owner_of(key);
        self.ids
            .iter()
            .position(|id| id == owner)
            .expect("owner is a member")
    }

    /// Get `key` from peer `i`, returning the value as a string.
    pub fn get(&self, i: usize, key: &str) -> Result<String, Error> {
        let mut out = String::new();
        self.groups[i].get(key, &mut StringSink::new(&mut out))?;
        Ok(out)
    }

    /// Mark peer `i` unreachable for fetches.
    pub fn kill(&self, i: usize) {
        self.down
            .write()
            .expect("down set lock poisoned")
            .insert(self.ids[i].clone());
    }

    /// Mark peer `i` reachable again.
    pub fn revive(&self, i: usize) {
        self.down
            .write()
            .expect("down set lock poisoned")
            .remove(&self.ids[i]);
    }

    /// Snapshot of every `(peer, key)` default-loader run so far.
    pub fn loads(&self) -> Vec<(String, String)> {
        self.loads.lock().expect("load log lock poisoned").clone()
    }
}
