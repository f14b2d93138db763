//! Coin-prefixed message signing with compact recoverable signatures, the
//! scheme wallets and explorers use to prove control of an address.

use std::io::Write;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use multicoins_bip32::secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use multicoins_bip32::{KeyError, Privkey, Pubkey};
use multicoins_core::hashes::{Hash256Digest, Hash256Writer};
use multicoins_core::ser::write_compact_int;

use crate::enc::{encode_address, Address};
use crate::nets::{CoinError, CoinPolicy};

/// The digest a signed message commits to: the double-SHA-256 of the
/// length-prefixed coin prefix followed by the length-prefixed message.
pub fn message_digest(policy: &CoinPolicy, message: &[u8]) -> Hash256Digest {
    let mut w = Hash256Writer::default();
    write_compact_int(&mut w, policy.message_prefix.len() as u64)
        .expect("no IOError from SHA2");
    w.write_all(policy.message_prefix.as_bytes())
        .expect("no IOError from SHA2");
    write_compact_int(&mut w, message.len() as u64).expect("no IOError from SHA2");
    w.write_all(message).expect("no IOError from SHA2");
    w.finish()
}

/// Sign a message, producing the conventional base64 65-byte compact form.
/// The header byte encodes the recovery id and the key's compression.
pub fn sign_message(key: &Privkey, policy: &CoinPolicy, message: &[u8]) -> String {
    let digest = message_digest(policy, message);
    let (recovery_id, compact) = key.sign_digest_recoverable(digest).serialize_compact();

    let mut blob = Vec::with_capacity(65);
    let header = 27
        + recovery_id.to_i32() as u8
        + if key.hint.is_compressed() { 4 } else { 0 };
    blob.push(header);
    blob.extend_from_slice(&compact);
    BASE64.encode(blob)
}

/// Recover the p2pkh address that signed a message.
pub fn recover_message(
    policy: &CoinPolicy,
    message: &[u8],
    signature_b64: &str,
) -> Result<String, CoinError> {
    let blob = BASE64
        .decode(signature_b64)
        .map_err(|_| KeyError::BadSignature)?;
    if blob.len() != 65 || !(27..27 + 8).contains(&blob[0]) {
        return Err(KeyError::BadSignature.into());
    }
    let compressed = blob[0] >= 31;
    let recovery_id = RecoveryId::from_i32(((blob[0] - 27) & 0x03) as i32)
        .map_err(KeyError::from)?;
    let sig = RecoverableSignature::from_compact(&blob[1..], recovery_id)
        .map_err(KeyError::from)?;

    let digest = message_digest(policy, message);
    let pubkey = Pubkey::recover(digest, &sig, compressed)?;
    Ok(encode_address(&Address::Pkh(pubkey.hash160()), policy)?)
}

/// Verify that a message signature was produced by the holder of an
/// address's key.
pub fn verify_message(
    policy: &CoinPolicy,
    address: &str,
    message: &[u8],
    signature_b64: &str,
) -> Result<bool, CoinError> {
    Ok(recover_message(policy, message, signature_b64)? == address)
}
