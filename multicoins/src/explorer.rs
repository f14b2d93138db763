//! The explorer transport contract. The library does no I/O of its own:
//! `unspent`, `history`, `fetchtx`, and `pushtx` are delegated to an
//! injectable adapter implementing [`Explorer`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by an explorer adapter. The raw response is carried
/// verbatim; the library never retries.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The explorer could not be reached at all.
    #[error("explorer unreachable: {0}")]
    Unreachable(String),

    /// The explorer answered with a non-success status.
    #[error("explorer returned status {status}: {body}")]
    BadStatus {
        /// The HTTP status code.
        status: u16,
        /// The response body, verbatim.
        body: String,
    },

    /// The response arrived but could not be interpreted.
    #[error("malformed explorer response: {0}")]
    BadResponse(String),
}

/// One unspent output as reported by an explorer. The txid is in display
/// (big-endian) order, as explorers print it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UnspentOutput {
    /// The funding transaction id, big-endian hex.
    pub txid: String,
    /// The output index.
    pub vout: u32,
    /// The value in satoshis.
    pub value: u64,
    /// Whether the output is a witness program, when the explorer reports
    /// it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segwit: Option<bool>,
}

/// One entry of an address's transaction history.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HistoryEntry {
    /// The transaction id, big-endian hex.
    pub txid: String,
    /// The confirmation height, if confirmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// The outcome of a broadcast.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PushOutcome {
    /// The explorer's status string, verbatim.
    pub status: String,
    /// The txid the explorer assigned, if it reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
}

/// A pluggable block-explorer transport. Implementations may block or
/// suspend; the library holds no cancellation-sensitive state of its own.
pub trait Explorer {
    /// The unspent outputs of an address.
    fn unspent(&self, address: &str) -> Result<Vec<UnspentOutput>, TransportError>;

    /// The raw hex of a transaction, looked up by big-endian txid.
    fn fetchtx(&self, txid: &str) -> Result<String, TransportError>;

    /// The prior transactions touching an address.
    fn history(&self, address: &str) -> Result<Vec<HistoryEntry>, TransportError>;

    /// Broadcast a raw transaction, hex-encoded.
    fn pushtx(&self, rawtx_hex: &str) -> Result<PushOutcome, TransportError>;
}
