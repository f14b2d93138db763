//! UTXOs and the information needed to spend them.

use crate::types::script::{Script, ScriptPubkey};
use crate::types::txin::Outpoint;

/// The spend constraint of a prevout, as a tagged variant carrying exactly
/// what signing needs: the redeem script for script-hash spends, nothing
/// extra for the pubkey-hash kinds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SpendScript {
    /// A legacy pay-to-pubkey-hash prevout. The sighash subscript is
    /// synthesized from the signing key.
    Pkh,
    /// A pay-to-script-hash prevout with its redeem script (a CHECKMULTISIG
    /// template for the standard multisig case).
    Sh(Script),
    /// A native v0 witness pubkey-hash prevout.
    Wpkh,
    /// A v0 witness pubkey-hash program nested in p2sh.
    ShWpkh,
}

impl SpendScript {
    /// True if signing this kind uses the BIP143 sighash and therefore
    /// requires the prevout amount.
    pub fn is_witness(&self) -> bool {
        matches!(self, SpendScript::Wpkh | SpendScript::ShWpkh)
    }
}

/// An unspent transaction output, carried with the context required to
/// spend it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Utxo {
    /// The outpoint identifying the UTXO.
    pub outpoint: Outpoint,
    /// The value in satoshis.
    pub value: u64,
    /// The locking script.
    pub script_pubkey: ScriptPubkey,
    /// The spend constraint kind.
    pub spend: SpendScript,
}

impl Utxo {
    /// Instantiate a new UTXO.
    pub fn new(
        outpoint: Outpoint,
        value: u64,
        script_pubkey: ScriptPubkey,
        spend: SpendScript,
    ) -> Self {
        Self {
            outpoint,
            value,
            script_pubkey,
            spend,
        }
    }
}
