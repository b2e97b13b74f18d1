//! Structured-message codec.
//!
//! Messages cross the cache as postcard-encoded bytes: [`MessageSink`]
//! decodes fetched bytes into a typed target, and [`set_message`] encodes
//! a typed value into any sink. Nothing here fixes a schema; any
//! `serde`-derived type goes.
//!
//! [`MessageSink`]: crate::MessageSink
//! [`set_message`]: crate::set_message

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Error;

/// Encode `message` to bytes.
pub fn marshal<T: Serialize>(message: &T) -> Result<Vec<u8>, Error> {
    postcard::to_allocvec(message).map_err(|e| Error::Codec(e.to_string()))
}

/// Decode a `T` from `bytes`.
pub fn unmarshal<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    postcard::from_bytes(bytes).map_err(|e| Error::Codec(e.to_string()))
}
