//! BIP32 extended keys and child derivation.

use hmac::{Hmac, Mac};
use multicoins_core::enc::base58;
use multicoins_core::enc::EncodingError;
use secp256k1::{Scalar, Secp256k1, SecretKey};
use sha2::Sha512;
use thiserror::Error;

use crate::keys::{KeyError, Privkey, Pubkey};
use crate::path::{DerivationPath, BIP32_HARDEN};
use crate::primitives::{Hint, KeyFingerprint, XKeyInfo};

type HmacSha512 = Hmac<Sha512>;

/// Errors raised during deterministic key derivation.
#[derive(Debug, Error)]
pub enum DerivationError {
    /// Hardened children commit to the parent private key; a public-only
    /// parent cannot derive them.
    #[error("cannot derive a hardened child from a public key")]
    HardenedFromPublic,

    /// The derived child scalar was zero or exceeded the curve order, and
    /// advancing the index ran out of room.
    #[error("key space exhausted advancing past index {0}")]
    ExhaustedKeySpace(u32),

    /// An Electrum seed must be exactly 128 bits of hex.
    #[error("seed must be 16 bytes, got {0}")]
    SeedLength(usize),

    /// A key-level failure while deriving.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Base58 decoding of a serialized extended key failed.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// A derivation path component was not a valid index.
    #[error("malformed derivation path component: {0}")]
    MalformedPath(String),

    /// A serialized extended key must be exactly 78 bytes.
    #[error("bad extended key payload length: {0}")]
    BadXKeyLength(usize),

    /// An extended private key pads its scalar with a zero byte.
    #[error("bad extended private key padding byte: {0:#04x}")]
    BadScalarPadding(u8),

    /// The version magic did not match the coin's extended-key prefix.
    #[error("unknown extended key version magic: {0:#010x}")]
    UnknownMagic(u32),
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> [u8; 64] {
    let mut mac = HmacSha512::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// A BIP32 extended private key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct XPriv {
    /// Depth, parent fingerprint, index, and chain code.
    pub info: XKeyInfo,
    /// The private key. BIP32 keys always derive compressed public keys.
    pub key: Privkey,
}

/// A BIP32 extended public key.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct XPub {
    /// Depth, parent fingerprint, index, and chain code.
    pub info: XKeyInfo,
    /// The public key, always serialized compressed.
    pub key: Pubkey,
}

impl XPriv {
    /// Generate the master key from a seed via
    /// `HMAC-SHA512(key = "Bitcoin seed", msg = seed)`.
    pub fn master_from_seed(seed: &[u8]) -> Result<Self, DerivationError> {
        let output = hmac_sha512(b"Bitcoin seed", seed);
        let (il, ir) = output.split_at(32);

        let key = SecretKey::from_slice(il).map_err(KeyError::from)?;
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(ir);

        Ok(Self {
            info: XKeyInfo {
                depth: 0,
                parent: KeyFingerprint::default(),
                index: 0,
                chain_code: chain_code.into(),
            },
            key: Privkey {
                key,
                hint: Hint::RawCompressed,
            },
        })
    }

    /// Derive the child at `index`. Hardened indices (`>= 2^31`) commit to
    /// the parent private key. If the derived scalar is invalid the index is
    /// advanced, per the BIP32 procedure.
    pub fn derive_child(&self, index: u32) -> Result<Self, DerivationError> {
        let hardened = index >= BIP32_HARDEN;
        let mut index = index;
        loop {
            let mut data = Vec::with_capacity(37);
            if index >= BIP32_HARDEN {
                data.push(0x00);
                data.extend_from_slice(&self.key.secret_bytes());
            } else {
                data.extend_from_slice(&self.key.pubkey_compressed().serialize_vec());
            }
            data.extend_from_slice(&index.to_be_bytes());

            let output = hmac_sha512(self.info.chain_code.as_ref(), &data);
            let (il, ir) = output.split_at(32);

            match tweak_scalar(il).and_then(|tweak| self.key.key.add_tweak(&tweak).ok()) {
                Some(child_key) => {
                    let mut chain_code = [0u8; 32];
                    chain_code.copy_from_slice(ir);
                    return Ok(Self {
                        info: XKeyInfo {
                            depth: self.info.depth + 1,
                            parent: self.key.pubkey_compressed().fingerprint(),
                            index,
                            chain_code: chain_code.into(),
                        },
                        key: Privkey {
                            key: child_key,
                            hint: Hint::RawCompressed,
                        },
                    });
                }
                None => {
                    // invalid IL; proceed with the next index
                    index = match index.checked_add(1) {
                        Some(next) if (next >= BIP32_HARDEN) == hardened => next,
                        _ => return Err(DerivationError::ExhaustedKeySpace(index)),
                    };
                }
            }
        }
    }

    /// Derive along a multi-level path.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self, DerivationError> {
        let mut current = *self;
        for index in path.iter() {
            current = current.derive_child(*index)?;
        }
        Ok(current)
    }

    /// The corresponding extended public key.
    pub fn to_xpub(&self) -> XPub {
        XPub {
            info: self.info,
            key: self.key.pubkey_compressed(),
        }
    }

    /// Serialize as Base58Check under the coin's private magic (`xprv`,
    /// `tprv`, `dgpv`, ...).
    pub fn serialize_base58(&self, magic: u32) -> String {
        let mut payload = xkey_payload(magic, &self.info);
        payload.push(0x00);
        payload.extend_from_slice(&self.key.secret_bytes());
        base58::encode_check(&payload)
    }

    /// Parse from Base58Check, checking the version magic.
    pub fn parse_base58(s: &str, magic: u32) -> Result<Self, DerivationError> {
        let (info, key_bytes) = parse_xkey_payload(s, magic)?;
        if key_bytes[0] != 0x00 {
            return Err(DerivationError::BadScalarPadding(key_bytes[0]));
        }
        let key = SecretKey::from_slice(&key_bytes[1..]).map_err(KeyError::from)?;
        Ok(Self {
            info,
            key: Privkey {
                key,
                hint: Hint::RawCompressed,
            },
        })
    }
}

impl XPub {
    /// Derive the child at `index`. Only normal (non-hardened) derivation is
    /// possible without the private key.
    pub fn derive_child(&self, index: u32) -> Result<Self, DerivationError> {
        if index >= BIP32_HARDEN {
            return Err(DerivationError::HardenedFromPublic);
        }
        let mut index = index;
        loop {
            let mut data = Vec::with_capacity(37);
            data.extend_from_slice(&self.key.key.serialize());
            data.extend_from_slice(&index.to_be_bytes());

            let output = hmac_sha512(self.info.chain_code.as_ref(), &data);
            let (il, ir) = output.split_at(32);

            let secp = Secp256k1::new();
            let tweaked = tweak_scalar(il)
                .and_then(|tweak| self.key.key.add_exp_tweak(&secp, &tweak).ok());
            match tweaked {
                Some(child_key) => {
                    let mut chain_code = [0u8; 32];
                    chain_code.copy_from_slice(ir);
                    return Ok(Self {
                        info: XKeyInfo {
                            depth: self.info.depth + 1,
                            parent: self.key.fingerprint(),
                            index,
                            chain_code: chain_code.into(),
                        },
                        key: Pubkey {
                            key: child_key,
                            compressed: true,
                        },
                    });
                }
                None => {
                    index = match index.checked_add(1) {
                        Some(next) if next < BIP32_HARDEN => next,
                        _ => return Err(DerivationError::ExhaustedKeySpace(index)),
                    };
                }
            }
        }
    }

    /// Derive along a multi-level path. Fails if any component is hardened.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self, DerivationError> {
        if path.has_hardened() {
            return Err(DerivationError::HardenedFromPublic);
        }
        let mut current = *self;
        for index in path.iter() {
            current = current.derive_child(*index)?;
        }
        Ok(current)
    }

    /// Serialize as Base58Check under the coin's public magic (`xpub`,
    /// `tpub`, `dgub`, ...).
    pub fn serialize_base58(&self, magic: u32) -> String {
        let mut payload = xkey_payload(magic, &self.info);
        payload.extend_from_slice(&self.key.key.serialize());
        base58::encode_check(&payload)
    }

    /// Parse from Base58Check, checking the version magic.
    pub fn parse_base58(s: &str, magic: u32) -> Result<Self, DerivationError> {
        let (info, key_bytes) = parse_xkey_payload(s, magic)?;
        Ok(Self {
            info,
            key: Pubkey::from_slice(&key_bytes)?,
        })
    }
}

fn tweak_scalar(il: &[u8]) -> Option<Scalar> {
    let mut buf = [0u8; 32];
    buf.copy_from_slice(il);
    Scalar::from_be_bytes(buf).ok()
}

fn xkey_payload(magic: u32, info: &XKeyInfo) -> Vec<u8> {
    let mut payload = Vec::with_capacity(78);
    payload.extend_from_slice(&magic.to_be_bytes());
    payload.push(info.depth);
    payload.extend_from_slice(info.parent.as_ref());
    payload.extend_from_slice(&info.index.to_be_bytes());
    payload.extend_from_slice(info.chain_code.as_ref());
    payload
}

fn parse_xkey_payload(s: &str, magic: u32) -> Result<(XKeyInfo, [u8; 33]), DerivationError> {
    let payload = base58::decode_check(s)?;
    if payload.len() != 78 {
        return Err(DerivationError::BadXKeyLength(payload.len()));
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&payload[..4]);
    let version = u32::from_be_bytes(version);
    if version != magic {
        return Err(DerivationError::UnknownMagic(version));
    }

    let mut parent = [0u8; 4];
    parent.copy_from_slice(&payload[5..9]);
    let mut index = [0u8; 4];
    index.copy_from_slice(&payload[9..13]);
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&payload[13..45]);
    let mut key_bytes = [0u8; 33];
    key_bytes.copy_from_slice(&payload[45..78]);

    Ok((
        XKeyInfo {
            depth: payload[4],
            parent: parent.into(),
            index: u32::from_be_bytes(index),
            chain_code: chain_code.into(),
        },
        key_bytes,
    ))
}
