//! Immutable view of cached bytes.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Cursor, Write};

use bytes::Bytes;

/// An immutable view of a cached value.
///
/// A view wraps a reference-counted buffer tagged with its origin (raw
/// bytes or a UTF-8 string), so string-originated values never pay a
/// conversion on the way in, and byte-originated values never pay one on
/// the way out. Cloning and sub-slicing are O(1) and share the buffer;
/// no accessor hands out a mutable handle, so the bytes observable
/// through a view never change.
///
/// Meant to be passed around as a value, like the `Bytes` it wraps.
#[derive(Clone)]
pub struct ByteView {
    repr: Repr,
}

#[derive(Clone)]
enum Repr {
    /// Byte-originated contents.
    Bytes(Bytes),
    /// String-originated contents. The full buffer was valid UTF-8 at
    /// construction; a sub-slice may cut through a code point.
    Str(Bytes),
}

impl ByteView {
    /// Length of the viewed bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Borrow the underlying bytes.
    ///
    /// Indexing the returned slice out of range panics, as with any
    /// slice; an out-of-range access is a programmer error.
    pub fn as_bytes(&self) -> &[u8] {
        match &self.repr {
            Repr::Bytes(b) | Repr::Str(b) => b,
        }
    }

    /// Whether the view was built from a string rather than raw bytes.
    ///
    /// Sinks without a zero-copy path use this to decide between their
    /// string and byte setters.
    pub fn is_string_backed(&self) -> bool {
        matches!(self.repr, Repr::Str(_))
    }

    /// A fresh owned copy of the bytes.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// The contents as a string, replacing any invalid UTF-8 lossily.
    ///
    /// String-backed views borrow; byte-backed views with valid UTF-8
    /// borrow too. Only invalid byte content allocates.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// The byte at index `i`. Out of range panics.
    pub fn at(&self, i: usize) -> u8 {
        self.as_bytes()[i]
    }

    /// A sub-view over `range`, sharing the underlying buffer.
    ///
    /// Panics when the range falls outside the view.
    pub fn slice(&self, range: impl std::ops::RangeBounds<usize>) -> ByteView {
        let repr = match &self.repr {
            Repr::Bytes(b) => Repr::Bytes(b.slice(range)),
            Repr::Str(b) => Repr::Str(b.slice(range)),
        };
        ByteView { repr }
    }

    /// A sub-view from `from` to the end, sharing the underlying buffer.
    pub fn slice_from(&self, from: usize) -> ByteView {
        self.slice(from..)
    }

    /// Copy up to `dest.len()` bytes into `dest`; returns the count written.
    pub fn copy_into(&self, dest: &mut [u8]) -> usize {
        let data = self.as_bytes();
        let n = data.len().min(dest.len());
        dest[..n].copy_from_slice(&data[..n]);
        n
    }

    /// A seekable reader over the bytes. Reads past the end return `Ok(0)`.
    pub fn reader(&self) -> Cursor<ByteView> {
        Cursor::new(self.clone())
    }

    /// Read into `buf` starting at `offset`, returning the count read.
    ///
    /// An offset at or past the end reads zero bytes; a count shorter
    /// than `buf` means the end of the view was reached.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let data = self.as_bytes();
        if offset >= data.len() as u64 {
            return Ok(0);
        }
        let start = offset as usize;
        let n = (data.len() - start).min(buf.len());
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    /// Stream every byte into `writer`.
    ///
    /// Returns the byte count written; a writer that stops short surfaces
    /// as [`io::ErrorKind::WriteZero`].
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<u64> {
        writer.write_all(self.as_bytes())?;
        Ok(self.len() as u64)
    }

    /// Unwrap the underlying shared buffer, dropping the origin tag.
    pub fn into_bytes(self) -> Bytes {
        match self.repr {
            Repr::Bytes(b) | Repr::Str(b) => b,
        }
    }
}

impl Default for ByteView {
    fn default() -> Self {
        ByteView {
            repr: Repr::Bytes(Bytes::new()),
        }
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = if self.is_string_backed() { "str" } else { "bytes" };
        write!(f, "ByteView({tag}, {} bytes)", self.len())
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<Bytes> for ByteView {
    fn from(bytes: Bytes) -> Self {
        ByteView {
            repr: Repr::Bytes(bytes),
        }
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(bytes: Vec<u8>) -> Self {
        ByteView {
            repr: Repr::Bytes(Bytes::from(bytes)),
        }
    }
}

impl From<&[u8]> for ByteView {
    fn from(bytes: &[u8]) -> Self {
        ByteView {
            repr: Repr::Bytes(Bytes::copy_from_slice(bytes)),
        }
    }
}

impl From<String> for ByteView {
    fn from(s: String) -> Self {
        ByteView {
            repr: Repr::Str(Bytes::from(s.into_bytes())),
        }
    }
}

impl From<&str> for ByteView {
    fn from(s: &str) -> Self {
        ByteView {
            repr: Repr::Str(Bytes::copy_from_slice(s.as_bytes())),
        }
    }
}

impl PartialEq for ByteView {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for ByteView {}

impl PartialEq<[u8]> for ByteView {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl PartialEq<&[u8]> for ByteView {
    fn eq(&self, other: &&[u8]) -> bool {
        self.as_bytes() == *other
    }
}

impl PartialEq<str> for ByteView {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for ByteView {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}
