//! Sinks: destinations for fetched values.
//!
//! A [`Sink`] receives the value produced by a cache get and exposes a
//! frozen [`ByteView`] of whatever was stored, which is what the cache
//! keeps. Every variant wraps a caller-provided target location and
//! overwrites it on set.
//!
//! Loaders should call a set method at least once on success; calling one
//! more than once is fine, and the last write wins.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::byteview::ByteView;
use crate::codec;
use crate::error::Error;

/// A destination for a value fetched from the cache.
///
/// Object-safe so loaders and the cache can write through `&mut dyn Sink`.
pub trait Sink {
    /// Set the value to `s`.
    fn set_string(&mut self, s: &str) -> Result<(), Error>;

    /// Set the value to the contents of `b`.
    ///
    /// The sink never retains `b`; a sink that needs the bytes later
    /// copies them.
    fn set_bytes(&mut self, b: &[u8]) -> Result<(), Error>;

    /// Set the value from an existing view.
    ///
    /// The default routes to [`set_bytes`](Sink::set_bytes) or
    /// [`set_string`](Sink::set_string) according to the view's backing.
    /// Sinks that can hold a `ByteView` directly override this to alias
    /// the buffer instead of copying: the fast path the cache takes on
    /// a local hit.
    fn set_view(&mut self, v: ByteView) -> Result<(), Error> {
        if v.is_string_backed() {
            self.set_string(&v.to_string_lossy())
        } else {
            self.set_bytes(v.as_bytes())
        }
    }

    /// A frozen view of the bytes stored by the last successful set.
    ///
    /// Before any set, the view is empty.
    fn view(&self) -> ByteView;
}

/// Encode `message` and hand it to `sink` as bytes.
///
/// On a [`MessageSink`] this decodes into the typed target (an
/// encode/decode round trip, deliberately, since the sink's target type
/// may differ from `T`); on every other sink the encoded bytes are
/// stored as-is.
pub fn set_message<S, T>(sink: &mut S, message: &T) -> Result<(), Error>
where
    S: Sink + ?Sized,
    T: Serialize,
{
    let bytes = codec::marshal(message)?;
    sink.set_bytes(&bytes)
}

/// Sink that overwrites a caller-provided `String`.
pub struct StringSink<'a> {
    dst: &'a mut String,
    view: ByteView,
}

impl<'a> StringSink<'a> {
    /// Wrap `dst`; it is overwritten by the first successful set.
    pub fn new(dst: &'a mut String) -> Self {
        Self {
            dst,
            view: ByteView::default(),
        }
    }
}

impl Sink for StringSink<'_> {
    fn set_string(&mut self, s: &str) -> Result<(), Error> {
        self.view = ByteView::from(s.to_owned());
        self.dst.clear();
        self.dst.push_str(s);
        Ok(())
    }

    fn set_bytes(&mut self, b: &[u8]) -> Result<(), Error> {
        self.set_string(&String::from_utf8_lossy(b))
    }

    fn view(&self) -> ByteView {
        self.view.clone()
    }
}

/// Sink that overwrites a caller-provided [`ByteView`].
///
/// Fast-path capable: a view handed to [`set_view`](Sink::set_view) is
/// stored as-is, aliasing the cache's buffer.
pub struct ViewSink<'a> {
    dst: &'a mut ByteView,
}

impl<'a> ViewSink<'a> {
    /// Wrap `dst`; it is overwritten by the first successful set.
    pub fn new(dst: &'a mut ByteView) -> Self {
        Self { dst }
    }
}

impl Sink for ViewSink<'_> {
    fn set_string(&mut self, s: &str) -> Result<(), Error> {
        *self.dst = ByteView::from(s.to_owned());
        Ok(())
    }

    fn set_bytes(&mut self, b: &[u8]) -> Result<(), Error> {
        // Defensive copy: the caller keeps ownership of b and may reuse it.
        *self.dst = ByteView::from(b.to_vec());
        Ok(())
    }

    fn set_view(&mut self, v: ByteView) -> Result<(), Error> {
        *self.dst = v;
        Ok(())
    }

    fn view(&self) -> ByteView {
        self.dst.clone()
    }
}

/// Sink that decodes received bytes into a typed target.
///
/// The target is authoritative; the view keeps the encoded form. Setting
/// a string or bytes decodes them; [`set_message`] re-encodes and decodes,
/// so the target type need not match the source type exactly as long as
/// the encodings line up.
pub struct MessageSink<'a, T> {
    dst: &'a mut T,
    view: ByteView,
}

impl<'a, T: DeserializeOwned> MessageSink<'a, T> {
    /// Wrap `dst`; it is overwritten by the first successful set.
    pub fn new(dst: &'a mut T) -> Self {
        Self {
            dst,
            view: ByteView::default(),
        }
    }
}

impl<T: DeserializeOwned> Sink for MessageSink<'_, T> {
    fn set_string(&mut self, s: &str) -> Result<(), Error> {
        self.set_bytes(s.as_bytes())
    }

    fn set_bytes(&mut self, b: &[u8]) -> Result<(), Error> {
        *self.dst = codec::unmarshal(b)?;
        self.view = ByteView::from(b.to_vec());
        Ok(())
    }

    fn view(&self) -> ByteView {
        self.view.clone()
    }
}

/// Sink that allocates a fresh byte buffer for the caller.
///
/// Fast-path capable: on [`set_view`](Sink::set_view) the view is kept
/// zero-copy and only the caller's buffer is allocated.
pub struct AllocatingByteSink<'a> {
    dst: &'a mut Vec<u8>,
    view: ByteView,
}

impl<'a> AllocatingByteSink<'a> {
    /// Wrap `dst`; it is replaced with a fresh allocation on set.
    pub fn new(dst: &'a mut Vec<u8>) -> Self {
        Self {
            dst,
            view: ByteView::default(),
        }
    }
}

impl Sink for AllocatingByteSink<'_> {
    fn set_string(&mut self, s: &str) -> Result<(), Error> {
        *self.dst = s.as_bytes().to_vec();
        self.view = ByteView::from(s.to_owned());
        Ok(())
    }

    fn set_bytes(&mut self, b: &[u8]) -> Result<(), Error> {
        // Two independent copies: the caller may mutate dst freely
        // without touching the frozen view.
        *self.dst = b.to_vec();
        self.view = ByteView::from(b.to_vec());
        Ok(())
    }

    fn set_view(&mut self, v: ByteView) -> Result<(), Error> {
        *self.dst = v.to_vec();
        self.view = v;
        Ok(())
    }

    fn view(&self) -> ByteView {
        self.view.clone()
    }
}

/// Sink that writes into a fixed-capacity byte buffer.
///
/// At most the buffer's current length is written; extra bytes are
/// silently dropped, and an under-filling value shrinks the buffer to the
/// count actually written. The frozen view always keeps the full,
/// untruncated value.
pub struct TruncatingByteSink<'a> {
    dst: &'a mut Vec<u8>,
    view: ByteView,
}

impl<'a> TruncatingByteSink<'a> {
    /// Wrap `dst`; its length at each set is the write capacity.
    pub fn new(dst: &'a mut Vec<u8>) -> Self {
        Self {
            dst,
            view: ByteView::default(),
        }
    }

    fn write_truncated(&mut self, b: &[u8]) {
        let n = b.len().min(self.dst.len());
        self.dst[..n].copy_from_slice(&b[..n]);
        self.dst.truncate(n);
    }
}

impl Sink for TruncatingByteSink<'_> {
    fn set_string(&mut self, s: &str) -> Result<(), Error> {
        self.write_truncated(s.as_bytes());
        self.view = ByteView::from(s.to_owned());
        Ok(())
    }

    fn set_bytes(&mut self, b: &[u8]) -> Result<(), Error> {
        self.write_truncated(b);
        self.view = ByteView::from(b.to_vec());
        Ok(())
    }

    fn view(&self) -> ByteView {
        self.view.clone()
    }
}
