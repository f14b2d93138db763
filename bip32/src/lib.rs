//! Key material for UTXO chains: raw secp256k1 keypairs carrying a
//! compression hint, WIF import/export, BIP32 hierarchical deterministic
//! keys, and Electrum v1 deterministic derivation.
//!
//! All curve arithmetic is delegated to the vetted `secp256k1` bindings.
//! Signing uses RFC 6979 deterministic nonces and emits low-S signatures.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod electrum;
pub mod keys;
pub mod path;
pub mod primitives;
pub mod xkeys;

pub use keys::{KeyError, Privkey, Pubkey};
pub use path::{DerivationPath, BIP32_HARDEN};
pub use primitives::{ChainCode, Hint, KeyFingerprint, XKeyInfo};
pub use xkeys::{DerivationError, XPriv, XPub};

/// Re-export of the curve backend so downstream crates stay on one version.
pub use secp256k1;
