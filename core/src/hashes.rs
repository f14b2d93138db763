//! Bitcoin-style hash functions and the marked-digest machinery used to keep
//! the many 32-byte digests in this workspace from being confused with one
//! another.

use std::io::Write;

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// A 32-byte digest, as produced by double-SHA-256.
pub type Hash256Digest = [u8; 32];

/// A 20-byte digest, as produced by `RIPEMD160(SHA256(x))`.
pub type Hash160Digest = [u8; 20];

/// `SHA256(SHA256(data))`.
pub fn sha256d(data: &[u8]) -> Hash256Digest {
    Sha256::digest(Sha256::digest(data)).into()
}

/// `RIPEMD160(SHA256(data))`. Used for addresses and key fingerprints.
pub fn hash160(data: &[u8]) -> Hash160Digest {
    Ripemd160::digest(Sha256::digest(data)).into()
}

/// A trait describing wrapped 32-byte digests. Digests are wrapped and named
/// by their function (TXID, WTXID, ...) to prevent type confusion.
pub trait MarkedDigest: Default + Copy {
    /// Wrap a digest in the marker type.
    fn from_digest(digest: Hash256Digest) -> Self;

    /// Return a copy of the internal digest.
    fn internal(&self) -> Hash256Digest;

    /// Return a copy with the byte order reversed. Bitcoin displays txids in
    /// big-endian, the wire carries them little-endian.
    fn reversed(&self) -> Self {
        let mut digest = self.internal();
        digest.reverse();
        Self::from_digest(digest)
    }
}

/// An incremental writer that computes the double-SHA-256 of everything
/// written to it. Writing to it never fails.
#[derive(Default)]
pub struct Hash256Writer {
    internal: Sha256,
}

impl Hash256Writer {
    /// Consume the writer and return the digest of the written bytes.
    pub fn finish(self) -> Hash256Digest {
        Sha256::digest(self.internal.finalize()).into()
    }

    /// Consume the writer and wrap the digest in a `MarkedDigest` type.
    pub fn finish_marked<M: MarkedDigest>(self) -> M {
        M::from_digest(self.finish())
    }
}

impl Write for Hash256Writer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.internal.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
