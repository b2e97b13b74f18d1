//! Consistent hashing ring for key-to-peer placement.
//!
//! This crate decides which peer of a cache cluster owns a key. Each peer
//! contributes `replicas` virtual points on a 32-bit ring; a key belongs
//! to the peer at the first point clockwise from the key's own hash.
//! Adding a peer moves only the keys that fall into its new arcs, so
//! membership changes reshuffle a minimal fraction of the key space.
//!
//! The virtual-point input format (the decimal replica index concatenated
//! with the peer identity, hashed with CRC32 IEEE by default) is part
//! of the contract: two processes sharing a peer set must agree on
//! ownership, so they must agree on the point positions.

mod ring;

pub use ring::{HashFn, Ring};
