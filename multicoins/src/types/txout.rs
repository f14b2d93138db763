//! Transaction outputs and the output vector.

use std::io::{Read, Write};

use multicoins_core::ser::{ByteFormat, SerError};

use crate::types::script::ScriptPubkey;

/// An output: a new UTXO to be created. The value is a satoshi amount
/// encoded as a little-endian u64; the locking script encodes the spending
/// constraints.
///
/// `TxOut::null()` has a value of `0xffff_ffff_ffff_ffff` and an empty
/// script, and is used within legacy SIGHASH_SINGLE calculations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxOut {
    /// The value of the output in satoshis.
    pub value: u64,
    /// The locking script.
    pub script_pubkey: ScriptPubkey,
}

impl Default for TxOut {
    fn default() -> Self {
        Self::null()
    }
}

impl TxOut {
    /// Instantiate a new output.
    pub fn new<T: Into<ScriptPubkey>>(value: u64, script_pubkey: T) -> Self {
        Self {
            value,
            script_pubkey: script_pubkey.into(),
        }
    }

    /// The null output used in legacy SIGHASH_SINGLE.
    pub fn null() -> Self {
        Self {
            value: 0xffff_ffff_ffff_ffff,
            script_pubkey: ScriptPubkey::null(),
        }
    }
}

impl ByteFormat for TxOut {
    type Error = SerError;

    fn serialized_length(&self) -> usize {
        8 + self.script_pubkey.serialized_length()
    }

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            value: Self::read_u64_le(reader)?,
            script_pubkey: ScriptPubkey::read_from(reader)?,
        })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize, Self::Error> {
        let mut len = Self::write_u64_le(writer, self.value)?;
        len += self.script_pubkey.write_to(writer)?;
        Ok(len)
    }
}

/// The output vector: a `CompactSize`-prefixed list of outputs.
pub type Vout = Vec<TxOut>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_serializes_and_deserializes_outputs() {
        let cases = [
            (TxOut::new(0, vec![]), "000000000000000000", 9),
            (TxOut::null(), "ffffffffffffffff00", 9),
        ];
        for case in cases.iter() {
            assert_eq!(case.0.serialized_length(), case.2);
            assert_eq!(case.0.serialize_hex(), case.1);
            assert_eq!(TxOut::deserialize_hex(case.1).unwrap(), case.0);
        }
    }
}
