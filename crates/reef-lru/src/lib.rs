//! Recency-ordered eviction index.
//!
//! This crate implements the LRU bookkeeping used by the reef cache tiers:
//! a mapping from key to value held in a doubly linked recency list, with
//! O(1) insert, lookup, removal, and oldest-entry eviction.
//!
//! The index is deliberately **not** thread-safe. Callers that share one
//! across threads wrap it in their own lock; the cache tiers put both of
//! their indexes behind a single mutex so eviction decisions can look at
//! the pair atomically.

mod lru;

pub use lru::{EvictionHook, LruCache};
