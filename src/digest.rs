//! Content digests and the streaming hash used to compute them.
//!
//! A sub-graph node is identified by the 128-bit MD5 of its canonical body
//! encoding. MD5 is used for identity and deduplication, not security; its
//! width keeps the collision probability negligible at the graph sizes the
//! codec encounters, and the sharing machinery relies on that.
//!
//! [`HashingWriter`] tees every written byte into both an in-memory body
//! buffer and the running hash, so the writer obtains a node's digest in the
//! same pass that produces its bytes. The body must be materialized anyway:
//! the digest and length precede the body on the wire.

use std::fmt;
use std::io::{self, Write};

use md5::{Digest as _, Md5};

/// Byte width of a content digest.
pub const DIGEST_LEN: usize = 16;

/// A 128-bit content digest identifying one sub-graph node.
///
/// Digests are owned values. Keys derived from an input buffer are copied
/// out of it, so they stay valid after the buffer is gone.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Wraps an owned 16-byte value.
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Copies a digest out of a slice. Returns `None` on length mismatch.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; DIGEST_LEN] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({self})")
    }
}

/// A writer that appends to a body buffer while feeding the same bytes to a
/// streaming MD5 state.
pub struct HashingWriter<'a> {
    buf: &'a mut Vec<u8>,
    hasher: Md5,
}

impl<'a> HashingWriter<'a> {
    /// Starts a new hashing pass over `buf`. The buffer is expected to be
    /// empty; bytes already present would not be hashed.
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        Self { buf, hasher: Md5::new() }
    }

    /// Finalizes the hash over everything written so far.
    pub fn finish(self) -> Digest {
        Digest(self.hasher.finalize().into())
    }
}

impl Write for HashingWriter<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.hasher.update(data);
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
