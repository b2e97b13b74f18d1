//! Consistent hashing ring implementation.

use std::collections::HashMap;

use tracing::debug;

/// Hash function mapping arbitrary bytes onto the ring's 32-bit space.
pub type HashFn = Box<dyn Fn(&[u8]) -> u32 + Send + Sync>;

/// Consistent hashing ring mapping keys to peer identities.
///
/// Each peer occupies `replicas` points on the ring, at positions
/// `hash(decimal(i) ++ peer)` for `i` in `[0, replicas)`. More replicas
/// per peer smooth the load distribution at the cost of a larger point
/// table.
///
/// The ring is immutable once built; concurrent reads need no locking.
/// Runtime membership changes must be serialized against readers by the
/// owner (the peer picker rebuilds the ring under a write lock).
pub struct Ring {
    hash: HashFn,
    replicas: usize,
    /// Point positions, ascending. Duplicate peers produce duplicate points.
    points: Vec<u32>,
    /// Point position -> peer identity. A hash tie between peers leaves
    /// whichever peer was added last.
    owners: HashMap<u32, String>,
}

impl Ring {
    /// Create an empty ring hashing with CRC32 (IEEE).
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, |data| crc32fast::hash(data))
    }

    /// Create an empty ring with a caller-supplied hash function.
    ///
    /// The function's full `u32` range is the ring's coordinate space.
    pub fn with_hasher(replicas: usize, hash: impl Fn(&[u8]) -> u32 + Send + Sync + 'static) -> Self {
        Self {
            hash: Box::new(hash),
            replicas,
            points: Vec::new(),
            owners: HashMap::new(),
        }
    }

    /// Add peers to the ring.
    ///
    /// Each peer contributes `replicas` points; the point list is
    /// re-sorted afterwards. Adding the same identity twice doubles its
    /// points; callers must not.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for peer in peers {
            let peer = peer.into();
            for i in 0..self.replicas {
                let point = (self.hash)(format!("{i}{peer}").as_bytes());
                self.points.push(point);
                self.owners.insert(point, peer.clone());
            }
            debug!(%peer, replicas = self.replicas, "added peer to ring");
        }
        self.points.sort_unstable();
    }

    /// Return the peer owning `key`, or `None` on an empty ring.
    ///
    /// The owner is the peer at the smallest point `>= hash(key)`,
    /// wrapping around to the first point past the top of the space.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.points.is_empty() {
            return None;
        }

        let hash = (self.hash)(key.as_bytes());
        let idx = self.points.partition_point(|&point| point < hash);
        let point = if idx == self.points.len() {
            self.points[0]
        } else {
            self.points[idx]
        };

        self.owners.get(&point).map(String::as_str)
    }

    /// Whether the ring has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total number of points on the ring (peers x replicas).
    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}
