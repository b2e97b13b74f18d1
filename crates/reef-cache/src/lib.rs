//! Distributed in-memory cache core.
//!
//! A [`Group`] is a namespace of cached keys spread across a cluster of
//! peers. A consistent-hash ring decides which peer owns each key; owners
//! fill misses through a user-supplied [`Loader`], everyone else asks the
//! owner through an injected [`Fetcher`]. Concurrent fills for the same
//! key collapse into one execution, and both cache tiers evict by recency
//! under a shared byte budget.
//!
//! Values travel as [`ByteView`]s (immutable, cheaply cloned views of the
//! cached bytes) and land in caller-provided [`Sink`]s, which can accept
//! a view without copying when their shape allows it.

mod byteview;
mod cache;
pub mod codec;
mod error;
mod group;
mod peers;
mod sink;

pub use byteview::ByteView;
pub use cache::CacheStats;
pub use error::Error;
pub use group::{Group, GroupConfig, Loader, Stats, Tier};
pub use peers::{Fetcher, NoPeers, PeerPicker, RingPicker};
pub use sink::{
    set_message, AllocatingByteSink, MessageSink, Sink, StringSink, TruncatingByteSink, ViewSink,
};

#[cfg(test)]
mod tests;
