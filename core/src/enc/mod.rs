//! Base58Check and Bech32 codecs, shared by addresses, WIF keys, and
//! extended-key serialization.

pub mod base58;
pub mod bech32;

use thiserror::Error;

/// Errors encountered while encoding or decoding Base58Check or Bech32
/// strings. Checksum failures are a distinct variant so callers can tell a
/// typo from a wrong-network string.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// The string contained a character outside the Base58 alphabet.
    #[error("invalid base58 character: {0}")]
    InvalidBase58(#[from] bs58::decode::Error),

    /// The Base58Check checksum did not match.
    #[error("base58check checksum mismatch: expected {expected:02x?}, got {got:02x?}")]
    ChecksumMismatch {
        /// The checksum computed from the payload.
        expected: [u8; 4],
        /// The checksum carried by the string.
        got: [u8; 4],
    },

    /// The decoded payload was too short to carry a checksum.
    #[error("base58check payload too short: {0} bytes")]
    PayloadTooShort(usize),

    /// Bech32 syntax error bubbled up from the bech32 crate.
    #[error(transparent)]
    Bech32(#[from] ::bech32::Error),

    /// The Bech32 string used a different human-readable part than the coin
    /// expects.
    #[error("wrong bech32 HRP: expected {expected}, got {got}")]
    WrongHrp {
        /// The HRP the coin's policy declares.
        expected: String,
        /// The HRP found in the string.
        got: String,
    },

    /// Only segwit version 0 programs are supported.
    #[error("unsupported segwit version: {0}")]
    UnsupportedWitnessVersion(u8),

    /// The witness program length was not one of the defined sizes.
    #[error("invalid witness program length: {0}")]
    BadProgramLength(usize),

    /// The version byte did not match any address form the coin defines.
    #[error("unknown address version byte: {0:#04x}")]
    UnknownVersionByte(u8),

    /// The address payload had the wrong length for its version byte.
    #[error("bad address payload length: {0}")]
    BadPayloadLength(usize),

    /// The coin has no bech32 human-readable part, so segwit addresses
    /// cannot be represented.
    #[error("coin does not define a bech32 HRP")]
    NoSegwitHrp,
}

/// Type alias for `Result` with an `EncodingError` error type.
pub type EncodingResult<T> = Result<T, EncodingError>;
