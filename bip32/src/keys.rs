//! Raw secp256k1 keypairs and WIF import/export.

use multicoins_core::enc::base58;
use multicoins_core::enc::EncodingError;
use multicoins_core::hashes::{hash160, Hash160Digest, Hash256Digest};
use secp256k1::ecdsa::{RecoverableSignature, Signature};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

use crate::primitives::{Hint, KeyFingerprint};

/// Errors raised while parsing or using key material.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The scalar was zero, exceeded the curve order, or the point was not
    /// on the curve.
    #[error(transparent)]
    Backend(#[from] secp256k1::Error),

    /// Base58 decoding of a WIF string failed.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// The key hex was malformed.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),

    /// A private key must be exactly 32 bytes.
    #[error("expected a 32 byte scalar, got {0} bytes")]
    BadScalarLength(usize),

    /// The WIF string decoded to an impossible length.
    #[error("bad WIF payload length: {0} bytes")]
    BadWifLength(usize),

    /// The WIF version byte belongs to a different coin or network.
    #[error("WIF version {got:#04x} does not match the coin prefix {expected:#04x}")]
    WifVersionMismatch {
        /// The version byte the coin's policy declares.
        expected: u8,
        /// The version byte carried by the WIF string.
        got: u8,
    },

    /// The WIF compression marker must be 0x01 when present.
    #[error("invalid WIF compression marker: {0:#04x}")]
    BadCompressionMarker(u8),

    /// The signature failed verification.
    #[error("signature did not verify")]
    BadSignature,

    /// The signature used a high S value and the coin requires low-S.
    #[error("high-S signature rejected by strict low-S policy")]
    HighS,
}

/// A secp256k1 private key together with the hint describing how it was
/// encoded. Immutable once constructed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Privkey {
    /// The scalar, guaranteed in `[1, n-1]`.
    pub key: SecretKey,
    /// The encoding hint, which fixes the compression of derived pubkeys.
    pub hint: Hint,
}

impl Privkey {
    /// Instantiate from 32 raw bytes. The derived public key will serialize
    /// uncompressed, matching how raw keys have historically been handled.
    pub fn from_raw(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != 32 {
            return Err(KeyError::BadScalarLength(bytes.len()));
        }
        Ok(Self {
            key: SecretKey::from_slice(bytes)?,
            hint: Hint::RawUncompressed,
        })
    }

    /// Instantiate from hex. A bare 64-character string derives an
    /// uncompressed public key; a 66-character string must end in `01` and
    /// derives a compressed one.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        match s.len() {
            64 => Self::from_raw(&hex::decode(s)?),
            66 => {
                let bytes = hex::decode(s)?;
                if bytes[32] != 0x01 {
                    return Err(KeyError::BadCompressionMarker(bytes[32]));
                }
                Ok(Self {
                    key: SecretKey::from_slice(&bytes[..32])?,
                    hint: Hint::RawCompressed,
                })
            }
            other => Err(KeyError::BadScalarLength(other / 2)),
        }
    }

    /// Import from WIF, checking the version byte against the coin's WIF
    /// prefix. A 33-byte payload (plus version) carries the 0x01 compression
    /// suffix and yields a compressed key.
    pub fn from_wif(wif: &str, expected_version: u8) -> Result<Self, KeyError> {
        let payload = base58::decode_check(wif)?;
        if payload.len() != 33 && payload.len() != 34 {
            return Err(KeyError::BadWifLength(payload.len()));
        }
        if payload[0] != expected_version {
            return Err(KeyError::WifVersionMismatch {
                expected: expected_version,
                got: payload[0],
            });
        }
        let hint = if payload.len() == 34 {
            if payload[33] != 0x01 {
                return Err(KeyError::BadCompressionMarker(payload[33]));
            }
            Hint::WifCompressed
        } else {
            Hint::WifUncompressed
        };
        Ok(Self {
            key: SecretKey::from_slice(&payload[1..33])?,
            hint,
        })
    }

    /// Parse a private key from any of the supported encodings: bare hex,
    /// hex with a compression marker, or WIF under the given prefix.
    pub fn parse(s: &str, wif_version: u8) -> Result<Self, KeyError> {
        let is_hex = (s.len() == 64 || s.len() == 66) && s.chars().all(|c| c.is_ascii_hexdigit());
        if is_hex {
            Self::from_hex(s)
        } else {
            Self::from_wif(s, wif_version)
        }
    }

    /// Export as WIF under the given prefix, carrying the compression suffix
    /// when the hint says the key is compressed.
    pub fn to_wif(&self, version: u8) -> String {
        let mut payload = Vec::with_capacity(34);
        payload.push(version);
        payload.extend_from_slice(&self.key.secret_bytes());
        if self.hint.is_compressed() {
            payload.push(0x01);
        }
        base58::encode_check(&payload)
    }

    /// The 32 raw scalar bytes.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.key.secret_bytes()
    }

    /// Derive the public key, honoring the compression hint.
    pub fn pubkey(&self) -> Pubkey {
        let secp = Secp256k1::new();
        Pubkey {
            key: PublicKey::from_secret_key(&secp, &self.key),
            compressed: self.hint.is_compressed(),
        }
    }

    /// Derive the public key in its compressed form regardless of the hint.
    /// Witness programs always commit to the compressed key.
    pub fn pubkey_compressed(&self) -> Pubkey {
        let secp = Secp256k1::new();
        Pubkey {
            key: PublicKey::from_secret_key(&secp, &self.key),
            compressed: true,
        }
    }

    /// Sign a 32-byte digest. Deterministic per RFC 6979; the emitted
    /// signature is always low-S.
    pub fn sign_digest(&self, digest: Hash256Digest) -> Signature {
        let secp = Secp256k1::new();
        let msg = Message::from_slice(&digest).expect("digest is 32 bytes");
        secp.sign_ecdsa(&msg, &self.key)
    }

    /// Sign a 32-byte digest, producing a recovery ID alongside.
    pub fn sign_digest_recoverable(&self, digest: Hash256Digest) -> RecoverableSignature {
        let secp = Secp256k1::new();
        let msg = Message::from_slice(&digest).expect("digest is 32 bytes");
        secp.sign_ecdsa_recoverable(&msg, &self.key)
    }
}

/// A secp256k1 public key tracking its serialization form. The compressed
/// and uncompressed encodings hash to different addresses, so the form is
/// preserved through the key lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pubkey {
    /// The curve point. Validated on construction: on-curve, not identity.
    pub key: PublicKey,
    /// Whether this key serializes in the 33-byte compressed form.
    pub compressed: bool,
}

impl Pubkey {
    /// Parse from SEC1 bytes. 33 bytes is compressed, 65 uncompressed.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        Ok(Self {
            key: PublicKey::from_slice(bytes)?,
            compressed: bytes.len() == 33,
        })
    }

    /// Serialize in the key's preferred form.
    pub fn serialize_vec(&self) -> Vec<u8> {
        if self.compressed {
            self.key.serialize().to_vec()
        } else {
            self.key.serialize_uncompressed().to_vec()
        }
    }

    /// Serialize as lowercase hex in the key's preferred form.
    pub fn serialize_hex(&self) -> String {
        hex::encode(self.serialize_vec())
    }

    /// `hash160` of the serialized key in its preferred form.
    pub fn hash160(&self) -> Hash160Digest {
        hash160(&self.serialize_vec())
    }

    /// BIP32 key fingerprint: the first 4 bytes of the `hash160` of the
    /// compressed serialization.
    pub fn fingerprint(&self) -> KeyFingerprint {
        let digest = hash160(&self.key.serialize());
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&digest[..4]);
        buf.into()
    }

    /// Verify a signature over a digest. High-S signatures are normalized
    /// and accepted unless `strict_low_s` is set, in which case they are
    /// rejected with [`KeyError::HighS`].
    pub fn verify_digest(
        &self,
        digest: Hash256Digest,
        sig: &Signature,
        strict_low_s: bool,
    ) -> Result<(), KeyError> {
        let secp = Secp256k1::new();
        let msg = Message::from_slice(&digest).expect("digest is 32 bytes");

        let mut normalized = *sig;
        normalized.normalize_s();
        let was_high_s = normalized != *sig;
        if was_high_s && strict_low_s {
            return Err(KeyError::HighS);
        }
        secp.verify_ecdsa(&msg, &normalized, &self.key)
            .map_err(|_| KeyError::BadSignature)
    }

    /// Recover the public key that produced a recoverable signature over the
    /// digest. The caller chooses the serialization form of the result.
    pub fn recover(
        digest: Hash256Digest,
        sig: &RecoverableSignature,
        compressed: bool,
    ) -> Result<Self, KeyError> {
        let secp = Secp256k1::new();
        let msg = Message::from_slice(&digest).expect("digest is 32 bytes");
        Ok(Self {
            key: secp.recover_ecdsa(&msg, sig)?,
            compressed,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use multicoins_core::hashes::sha256d;

    // the classic wiki keypair
    const RAW: &str = "0c28fca386c7a227600b2fe50b7cae11ec86d3bf1fbe471be89827e19d72aa1d";
    const WIF_UNCOMPRESSED: &str = "5HueCGU8rMjxEXxiPuD5BDku4MkFqeZyd4dZ1jvhTVqvbTLvyTJ";
    const WIF_COMPRESSED: &str = "KwdMAjGmerYanjeui5SHS7JkmpZvVipYvB2LJGU1ZxJwYvP98617";

    #[test]
    fn it_imports_and_exports_wif() {
        let key = Privkey::from_wif(WIF_UNCOMPRESSED, 0x80).unwrap();
        assert_eq!(hex::encode(key.secret_bytes()), RAW);
        assert_eq!(key.hint, Hint::WifUncompressed);
        assert_eq!(key.to_wif(0x80), WIF_UNCOMPRESSED);

        let key = Privkey::from_wif(WIF_COMPRESSED, 0x80).unwrap();
        assert_eq!(hex::encode(key.secret_bytes()), RAW);
        assert!(key.hint.is_compressed());
        assert_eq!(key.to_wif(0x80), WIF_COMPRESSED);
    }

    #[test]
    fn it_rejects_foreign_wif_versions() {
        match Privkey::from_wif(WIF_UNCOMPRESSED, 0xef) {
            Err(KeyError::WifVersionMismatch {
                expected: 0xef,
                got: 0x80,
            }) => {}
            other => panic!("expected WifVersionMismatch, got {:?}", other),
        }
    }

    #[test]
    fn it_tracks_compression_through_parsing() {
        let bare = Privkey::parse(RAW, 0x80).unwrap();
        assert!(!bare.hint.is_compressed());
        assert_eq!(bare.pubkey().serialize_vec().len(), 65);

        let marked = Privkey::parse(&format!("{}01", RAW), 0x80).unwrap();
        assert!(marked.hint.is_compressed());
        assert_eq!(marked.pubkey().serialize_vec().len(), 33);

        // same point either way
        assert_eq!(bare.pubkey().key, marked.pubkey().key);
    }

    #[test]
    fn it_signs_deterministically_and_verifies() {
        let key = Privkey::from_hex(RAW).unwrap();
        let digest = sha256d(b"deterministic signing");

        let sig1 = key.sign_digest(digest);
        let sig2 = key.sign_digest(digest);
        assert_eq!(sig1, sig2);

        key.pubkey().verify_digest(digest, &sig1, true).unwrap();
        assert!(matches!(
            key.pubkey().verify_digest(sha256d(b"other"), &sig1, false),
            Err(KeyError::BadSignature)
        ));
    }

    #[test]
    fn it_recovers_the_signing_key() {
        let key = Privkey::from_hex(&format!("{}01", RAW)).unwrap();
        let digest = sha256d(b"recover me");
        let sig = key.sign_digest_recoverable(digest);
        let recovered = Pubkey::recover(digest, &sig, true).unwrap();
        assert_eq!(recovered, key.pubkey());
    }
}
