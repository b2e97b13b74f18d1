//! Byte-accounted LRU tier used inside a [`Group`].
//!
//! [`Group`]: crate::Group

use reef_lru::LruCache;
use tracing::debug;

use crate::byteview::ByteView;

/// Point-in-time counters for one cache tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Bytes held, counting keys and values.
    pub bytes: u64,
    /// Entries held.
    pub items: u64,
    /// Lookups served.
    pub gets: u64,
    /// Lookups that hit.
    pub hits: u64,
    /// Entries evicted over the tier's lifetime.
    pub evictions: u64,
}

/// A byte-accounted LRU tier.
///
/// Not internally synchronized: the owning group keeps both of its tiers
/// behind one mutex, so eviction decisions can weigh the pair atomically.
/// Entry count is unbounded here; the group enforces the byte budget by
/// calling [`remove_oldest`](ByteCache::remove_oldest) until it fits.
pub(crate) struct ByteCache {
    lru: LruCache<String, ByteView>,
    nbytes: u64,
    ngets: u64,
    nhits: u64,
    nevicts: u64,
}

impl ByteCache {
    pub fn new() -> Self {
        Self {
            lru: LruCache::new(0),
            nbytes: 0,
            ngets: 0,
            nhits: 0,
            nevicts: 0,
        }
    }

    /// Insert a value, refreshing recency and the byte account.
    pub fn add(&mut self, key: String, value: ByteView) {
        let key_len = key.len() as u64;
        let value_len = value.len() as u64;
        if let Some(old) = self.lru.insert(key, value) {
            self.nbytes -= key_len + old.len() as u64;
        }
        self.nbytes += key_len + value_len;
    }

    /// Look up a value, refreshing its recency on a hit.
    pub fn get(&mut self, key: &str) -> Option<ByteView> {
        self.ngets += 1;
        let value = self.lru.get(key)?.clone();
        self.nhits += 1;
        Some(value)
    }

    /// Evict the least recently used entry, returning it.
    pub fn remove_oldest(&mut self) -> Option<(String, ByteView)> {
        let (key, value) = self.lru.remove_oldest()?;
        self.nbytes -= key.len() as u64 + value.len() as u64;
        self.nevicts += 1;
        debug!(%key, "evicted cache entry");
        Some((key, value))
    }

    /// Bytes currently held (keys + values).
    pub fn bytes(&self) -> u64 {
        self.nbytes
    }

    /// Snapshot the tier's counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            bytes: self.nbytes,
            items: self.lru.len() as u64,
            gets: self.ngets,
            hits: self.nhits,
            evictions: self.nevicts,
        }
    }
}
