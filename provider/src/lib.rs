//! Pluggable block-explorer backends for the multicoins transport contract.
//!
//! The library crate defines the [`multicoins::explorer::Explorer`] trait
//! and does no I/O; this crate supplies concrete adapters. The Esplora
//! adapter speaks the Blockstream-style REST API over blocking HTTP.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

#[cfg(feature = "esplora")]
pub mod esplora;

#[cfg(feature = "esplora")]
pub use esplora::EsploraProvider;
