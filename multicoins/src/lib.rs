//! A multi-coin client library for Bitcoin and its UTXO-family forks:
//! Bitcoin Cash, Litecoin, Dash, and Dogecoin, plus their testnets.
//!
//! The library covers key material, addresses, the transaction codec
//! (legacy and segwit), sighash construction (legacy, BIP143, and the BCH
//! fork-id variant), and script assembly per input kind. Per-coin variation
//! is data, not subclassing: one set of algorithms consults a
//! [`nets::CoinPolicy`] record for prefixes, fork ids, and sighash quirks.
//!
//! Network I/O is behind the [`explorer::Explorer`] trait; the library
//! itself never touches a socket.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod builder;
pub mod enc;
pub mod explorer;
pub mod hashes;
pub mod messages;
pub mod nets;
pub mod sign;
pub mod types;

/// Common re-exports.
pub mod prelude;
