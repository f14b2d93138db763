//! Simple types used throughout the key crates.

/// A BIP32 chain code.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ChainCode(pub [u8; 32]);

impl From<[u8; 32]> for ChainCode {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for ChainCode {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The first 4 bytes of the `hash160` of a compressed public key. Identifies
/// a parent key in BIP32 serialization. Fingerprints may collide; they are a
/// convenience, not a security feature.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct KeyFingerprint(pub [u8; 4]);

impl From<[u8; 4]> for KeyFingerprint {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for KeyFingerprint {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// How a private key entered the system. The hint decides whether the
/// derived public key serializes compressed, which changes the resulting
/// addresses and sighashes, so it is stored with the scalar rather than
/// decided at each call site.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Hint {
    /// Parsed from raw bytes or bare 64-character hex. Uncompressed.
    RawUncompressed,
    /// Parsed from 66-character hex carrying the trailing `01` marker.
    RawCompressed,
    /// Parsed from WIF without the compression suffix.
    WifUncompressed,
    /// Parsed from WIF carrying the 0x01 compression suffix.
    WifCompressed,
}

impl Hint {
    /// True if public keys derived from this private key serialize in the
    /// 33-byte compressed form.
    pub fn is_compressed(&self) -> bool {
        matches!(self, Hint::RawCompressed | Hint::WifCompressed)
    }

    /// True if the key was imported from WIF.
    pub fn is_wif(&self) -> bool {
        matches!(self, Hint::WifCompressed | Hint::WifUncompressed)
    }
}

/// The derivation metadata attached to an extended key: everything but the
/// key itself.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct XKeyInfo {
    /// The number of derivations between this key and the master.
    pub depth: u8,
    /// The fingerprint of the parent key. Zeroed for the master.
    pub parent: KeyFingerprint,
    /// The index this key was derived at. Zeroed for the master.
    pub index: u32,
    /// The chain code.
    pub chain_code: ChainCode,
}
