//! Transaction inputs, their components, and the input vector.

use std::io::{Read, Write};

use multicoins_core::ser::{ByteFormat, SerError};

use crate::hashes::TXID;
use crate::types::script::ScriptSig;

/// An outpoint: the unique identifier of a UTXO, composed of a transaction
/// id (in wire little-endian order) and the index of the output within that
/// transaction's output vector.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Outpoint {
    /// The id of the transaction that created the UTXO.
    pub txid: TXID,
    /// The output's index in the creating transaction.
    pub idx: u32,
}

impl Outpoint {
    /// Instantiate a new outpoint.
    pub fn new(txid: TXID, idx: u32) -> Self {
        Self { txid, idx }
    }

    /// The null outpoint, used in coinbase inputs.
    pub fn null() -> Self {
        Self {
            txid: TXID::default(),
            idx: 0xffff_ffff,
        }
    }
}

impl ByteFormat for Outpoint {
    type Error = SerError;

    fn serialized_length(&self) -> usize {
        36
    }

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            txid: TXID::read_from(reader)?,
            idx: Self::read_u32_le(reader)?,
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize, Self::Error> {
        let mut len = self.txid.write_to(writer)?;
        len += Self::write_u32_le(writer, self.idx)?;
        Ok(len)
    }
}

/// A transaction input. Contains an outpoint referencing an existing UTXO, a
/// `script_sig` carrying spend authorization (empty until signed, and empty
/// forever for native witness spends), and a sequence number.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TxIn {
    /// The UTXO being spent.
    pub outpoint: Outpoint,
    /// The spend-authorization script.
    pub script_sig: ScriptSig,
    /// The sequence number. May encode relative locktime semantics in
    /// version 2+ transactions.
    pub sequence: u32,
}

impl TxIn {
    /// Instantiate a new input.
    pub fn new<T: Into<ScriptSig>>(outpoint: Outpoint, script_sig: T, sequence: u32) -> Self {
        Self {
            outpoint,
            script_sig: script_sig.into(),
            sequence,
        }
    }

    /// An unsigned input spending the outpoint with the default sequence.
    pub fn unsigned(outpoint: Outpoint) -> Self {
        Self::new(outpoint, vec![], 0xffff_ffff)
    }
}

impl ByteFormat for TxIn {
    type Error = SerError;

    fn serialized_length(&self) -> usize {
        36 + self.script_sig.serialized_length() + 4
    }

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            outpoint: Outpoint::read_from(reader)?,
            script_sig: ScriptSig::read_from(reader)?,
            sequence: Self::read_u32_le(reader)?,
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize, Self::Error> {
        let mut len = self.outpoint.write_to(writer)?;
        len += self.script_sig.write_to(writer)?;
        len += Self::write_u32_le(writer, self.sequence)?;
        Ok(len)
    }
}

/// The input vector: a `CompactSize`-prefixed list of inputs.
pub type Vin = Vec<TxIn>;
