//! Error types for the cache core.

/// Errors that can surface from cache operations.
///
/// Variants carry rendered messages rather than boxed sources so an
/// outcome stays `Clone`: a failed fill is shared verbatim with every
/// single-flight waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Structured-message encode or decode failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// A remote peer fetch failed.
    #[error("peer fetch failed: {0}")]
    PeerFetch(String),

    /// The user-supplied loader failed.
    #[error("loader error: {0}")]
    Loader(String),
}
