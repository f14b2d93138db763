//! Low-level primitives shared by the multicoins crates: a byte-oriented
//! serialization trait for consensus objects, Bitcoin-style hash functions and
//! marked digests, and the Base58Check / Bech32 address codecs.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

#[doc(hidden)]
#[macro_use]
pub mod macros;

pub mod enc;
pub mod hashes;
pub mod ser;

pub use enc::EncodingError;
pub use ser::{ByteFormat, SerError, SerResult};

#[doc(hidden)]
pub use hex;
