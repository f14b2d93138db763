//! Electrum v1 deterministic derivation: a 128-bit hex seed is stretched by
//! iterated SHA-256 into a master scalar, and child keys are seed-committed
//! offsets of it. Electrum v1 keys are always uncompressed.

use sha2::{Digest, Sha256};

use secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey};

use crate::keys::{KeyError, Privkey, Pubkey};
use crate::primitives::Hint;
use crate::xkeys::DerivationError;

const STRETCH_ROUNDS: usize = 100_000;

/// Stretch a 16-byte seed into the master scalar:
/// `x = seed; repeat 100,000 times: x = SHA256(x ‖ seed)`.
fn stretch(seed: &[u8; 16]) -> [u8; 32] {
    let mut x = seed.to_vec();
    for _ in 0..STRETCH_ROUNDS {
        let mut hasher = Sha256::new();
        hasher.update(&x);
        hasher.update(seed);
        x = hasher.finalize().to_vec();
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&x);
    out
}

/// The scalar offset of the child at `(index, for_change)`:
/// `SHA-256("<index>:<change>:" ‖ seed)`. The offset commits to the seed,
/// so even watch-only child derivation needs the seed alongside the point.
fn child_offset(seed: &[u8; 16], index: u32, for_change: bool) -> Option<Scalar> {
    let mut data = format!("{}:{}:", index, u8::from(for_change)).into_bytes();
    data.extend_from_slice(seed);
    Scalar::from_be_bytes(Sha256::digest(&data).into()).ok()
}

fn decode_seed(seed_hex: &str) -> Result<[u8; 16], DerivationError> {
    let bytes = hex::decode(seed_hex).map_err(KeyError::from)?;
    if bytes.len() != 16 {
        return Err(DerivationError::SeedLength(bytes.len()));
    }
    let mut seed = [0u8; 16];
    seed.copy_from_slice(&bytes);
    Ok(seed)
}

/// An Electrum v1 master public key: the uncompressed point of the stretched
/// seed, without its 0x04 prefix. Child public keys are derived by tweaking
/// this point with the seed-committed offset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ElectrumMpk([u8; 64]);

impl ElectrumMpk {
    /// Wrap a 64-byte master public key.
    pub fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Parse from the conventional 128-character hex form.
    pub fn from_hex(s: &str) -> Result<Self, DerivationError> {
        let bytes = hex::decode(s).map_err(KeyError::from)?;
        if bytes.len() != 64 {
            return Err(DerivationError::BadXKeyLength(bytes.len()));
        }
        let mut mpk = [0u8; 64];
        mpk.copy_from_slice(&bytes);
        Ok(Self(mpk))
    }

    /// The raw 64 bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Render as hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Derive the child public key at `(index, for_change)`. The offset
    /// hashes the seed, so the seed is required here too.
    pub fn child_pubkey(
        &self,
        seed_hex: &str,
        index: u32,
        for_change: bool,
    ) -> Result<Pubkey, DerivationError> {
        let seed = decode_seed(seed_hex)?;
        let mut point = [0u8; 65];
        point[0] = 0x04;
        point[1..].copy_from_slice(&self.0);
        let parent = PublicKey::from_slice(&point).map_err(KeyError::from)?;

        let offset = child_offset(&seed, index, for_change)
            .ok_or(DerivationError::ExhaustedKeySpace(index))?;
        let secp = Secp256k1::new();
        let child = parent
            .add_exp_tweak(&secp, &offset)
            .map_err(KeyError::from)?;
        Ok(Pubkey {
            key: child,
            compressed: false,
        })
    }
}

/// An Electrum v1 master key, derived from a 128-bit hex seed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ElectrumMaster {
    seed: [u8; 16],
    stretched: SecretKey,
    mpk: ElectrumMpk,
}

impl ElectrumMaster {
    /// Stretch a 128-bit hex seed into the master key.
    pub fn from_seed(seed_hex: &str) -> Result<Self, DerivationError> {
        let seed = decode_seed(seed_hex)?;
        let stretched = SecretKey::from_slice(&stretch(&seed)).map_err(KeyError::from)?;

        let secp = Secp256k1::new();
        let point = PublicKey::from_secret_key(&secp, &stretched).serialize_uncompressed();
        let mut mpk = [0u8; 64];
        mpk.copy_from_slice(&point[1..]);

        Ok(Self {
            seed,
            stretched,
            mpk: ElectrumMpk(mpk),
        })
    }

    /// The master public key.
    pub fn mpk(&self) -> ElectrumMpk {
        self.mpk
    }

    /// Derive the child private key at `(index, for_change)`:
    /// `stretched + SHA-256("<index>:<change>:" ‖ seed) mod n`.
    pub fn child_privkey(&self, index: u32, for_change: bool) -> Result<Privkey, DerivationError> {
        let offset = child_offset(&self.seed, index, for_change)
            .ok_or(DerivationError::ExhaustedKeySpace(index))?;
        let key = self
            .stretched
            .add_tweak(&offset)
            .map_err(KeyError::from)?;
        Ok(Privkey {
            key,
            hint: Hint::RawUncompressed,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SEED: &str = "484ccb566edb66c65dd0fd2e4d90ef65";

    #[test]
    fn it_rejects_seeds_that_are_not_128_bits() {
        match ElectrumMaster::from_seed("abcd") {
            Err(DerivationError::SeedLength(2)) => {}
            other => panic!("expected SeedLength, got {:?}", other),
        }
        assert!(ElectrumMaster::from_seed("zzzz").is_err());
    }

    #[test]
    fn it_agrees_between_private_and_public_derivation() {
        let master = ElectrumMaster::from_seed(SEED).unwrap();
        let mpk = master.mpk();

        for (index, for_change) in [(0u32, false), (0, true), (5, false), (73, true)] {
            let privkey = master.child_privkey(index, for_change).unwrap();
            let pubkey = mpk.child_pubkey(SEED, index, for_change).unwrap();
            assert_eq!(privkey.pubkey().key, pubkey.key);
            // v1 keys are uncompressed on both derivation paths
            assert!(!privkey.hint.is_compressed());
            assert!(!pubkey.compressed);
        }
    }

    #[test]
    fn it_round_trips_the_mpk_hex_form() {
        let master = ElectrumMaster::from_seed(SEED).unwrap();
        let mpk = master.mpk();
        assert_eq!(mpk.to_hex().len(), 128);
        assert_eq!(ElectrumMpk::from_hex(&mpk.to_hex()).unwrap(), mpk);
    }

    #[test]
    fn it_separates_receive_and_change_chains() {
        let master = ElectrumMaster::from_seed(SEED).unwrap();
        let receive = master.child_privkey(0, false).unwrap();
        let change = master.child_privkey(0, true).unwrap();
        assert_ne!(receive.secret_bytes(), change.secret_bytes());
    }
}
