//! A chained transaction builder. `mktx` on the façade is a thin wrapper
//! over this.

use crate::types::script::{ScriptPubkey, ScriptSig, Witness};
use crate::types::tx::Transaction;
use crate::types::txin::{Outpoint, TxIn};
use crate::types::txout::TxOut;

/// Builds a transaction incrementally. Inputs, outputs, script sigs, and
/// witnesses are added one at a time; `build` freezes the result.
#[derive(Clone, Debug, Default)]
pub struct TxBuilder {
    version: u32,
    vin: Vec<TxIn>,
    vout: Vec<TxOut>,
    witnesses: Vec<Witness>,
    locktime: u32,
}

impl TxBuilder {
    /// Start a new builder at version 1.
    pub fn new() -> Self {
        Self {
            version: 1,
            ..Default::default()
        }
    }

    /// Set the version.
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Add an unsigned input spending `outpoint`.
    pub fn spend(mut self, outpoint: Outpoint, sequence: u32) -> Self {
        self.vin.push(TxIn::new(outpoint, vec![], sequence));
        self
    }

    /// Add an output paying `value` to a locking script.
    pub fn pay<T: Into<ScriptPubkey>>(mut self, value: u64, script_pubkey: T) -> Self {
        self.vout.push(TxOut::new(value, script_pubkey));
        self
    }

    /// Extend the input vector.
    pub fn extend_inputs<I: IntoIterator<Item = TxIn>>(mut self, inputs: I) -> Self {
        self.vin.extend(inputs);
        self
    }

    /// Extend the output vector.
    pub fn extend_outputs<I: IntoIterator<Item = TxOut>>(mut self, outputs: I) -> Self {
        self.vout.extend(outputs);
        self
    }

    /// Set the script sig of input `index`.
    pub fn set_script_sig(mut self, index: usize, script_sig: ScriptSig) -> Self {
        self.vin[index].script_sig = script_sig;
        self
    }

    /// Append witness stacks, one per input in order.
    pub fn extend_witnesses<I: IntoIterator<Item = Witness>>(mut self, witnesses: I) -> Self {
        self.witnesses.extend(witnesses);
        self
    }

    /// Set the locktime.
    pub fn locktime(mut self, locktime: u32) -> Self {
        self.locktime = locktime;
        self
    }

    /// Freeze into a transaction.
    pub fn build(self) -> Transaction {
        let mut tx = Transaction::new(self.version, self.vin, self.vout, self.locktime);
        for (index, witness) in self.witnesses.into_iter().enumerate() {
            if !witness.is_empty() {
                tx.set_witness(index, witness);
            }
        }
        tx
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hashes::TXID;

    #[test]
    fn it_builds_what_it_is_told() {
        let outpoint = Outpoint::new(TXID::from([0xab; 32]), 3);
        let tx = TxBuilder::new()
            .version(2)
            .spend(outpoint, 0xffff_fffe)
            .pay(50_000, ScriptPubkey::p2pkh_from_hash([0x01; 20]))
            .pay(25_000, ScriptPubkey::p2sh_from_hash([0x02; 20]))
            .locktime(650_000)
            .build();

        let manual = Transaction::new(
            2,
            vec![TxIn::new(outpoint, vec![], 0xffff_fffe)],
            vec![
                TxOut::new(50_000, ScriptPubkey::p2pkh_from_hash([0x01; 20])),
                TxOut::new(25_000, ScriptPubkey::p2sh_from_hash([0x02; 20])),
            ],
            650_000,
        );
        assert_eq!(tx, manual);
        assert!(!tx.has_witness());
    }
}
