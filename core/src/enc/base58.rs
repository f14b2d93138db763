//! Base58Check: Base58 with a 4-byte double-SHA-256 checksum appended.

use crate::enc::{EncodingError, EncodingResult};
use crate::hashes::sha256d;

/// Encode a payload (version byte(s) included) as Base58Check.
pub fn encode_check(payload: &[u8]) -> String {
    let mut data = payload.to_vec();
    data.extend_from_slice(&sha256d(payload)[..4]);
    bs58::encode(data).into_string()
}

/// Decode a Base58Check string, verifying and stripping the checksum. The
/// returned payload includes the version byte(s).
pub fn decode_check(s: &str) -> EncodingResult<Vec<u8>> {
    let decoded = bs58::decode(s).into_vec()?;
    if decoded.len() < 5 {
        return Err(EncodingError::PayloadTooShort(decoded.len()));
    }
    let (payload, checksum) = decoded.split_at(decoded.len() - 4);

    let mut got = [0u8; 4];
    got.copy_from_slice(checksum);
    let mut expected = [0u8; 4];
    expected.copy_from_slice(&sha256d(payload)[..4]);

    if expected != got {
        return Err(EncodingError::ChecksumMismatch { expected, got });
    }
    Ok(payload.to_vec())
}
