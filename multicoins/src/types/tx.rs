//! The transaction model and codec, including the layered BIP141 witness
//! format, and sighash preimage construction: legacy, BIP143, and the
//! Bitcoin Cash fork-id variant.

use std::io::{Read, Write};

use thiserror::Error;

use multicoins_core::hashes::{Hash256Digest, Hash256Writer};
use multicoins_core::ser::{
    read_compact_int, read_compact_int_tail, read_prefix_vec, write_compact_int,
    write_prefix_vec, ByteFormat, SerError,
};

use crate::hashes::{TXID, WTXID};
use crate::types::script::{Script, ScriptSig, Witness, WitnessStackItem};
use crate::types::txin::TxIn;
use crate::types::txout::TxOut;

/// The fork-id bit BCH sets in every sighash byte.
pub const SIGHASH_FORKID: u8 = 0x40;

/// Errors raised by the transaction codec and sighash construction.
#[derive(Debug, Error)]
pub enum TxError {
    /// Serialization-related errors.
    #[error(transparent)]
    SerError(#[from] SerError),

    /// IOError bubbled up from a `Write` passed to a serializer.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Got an unknown flag where we expected a witness flag. May indicate a
    /// non-witness transaction.
    #[error("witness flag not as expected. Got {0:#04x}. Expected 0x01.")]
    BadWitnessFlag(u8),

    /// The marker and flag claimed witness data, but every stack was empty.
    #[error("marker and flag present but every witness stack is empty")]
    WitnessFlagNoWitness,

    /// A witness vector must carry exactly one stack per input.
    #[error("witness vector length {got} does not match input count {expected}")]
    WitnessCountMismatch {
        /// The input count.
        expected: usize,
        /// The witness stack count.
        got: usize,
    },

    /// Caller provided an unknown sighash flag.
    #[error("unknown sighash flag: {0:#04x}")]
    UnknownSighash(u8),

    /// Satoshi's SIGHASH_SINGLE bug. We error instead of reproducing the
    /// insecure protocol behavior.
    #[error("SIGHASH_SINGLE has no output matching input index {0}")]
    SighashSingleBug(usize),
}

/// Type alias for result with TxError.
pub type TxResult<T> = Result<T, TxError>;

/// All sighash modes. The low 5 bits select the base mode; 0x80 is
/// ANYONECANPAY. The BCH fork-id bit is not part of this enum: it is policy
/// data, applied when the hash type is written.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sighash {
    /// Sign ALL inputs and ALL outputs.
    All = 0x01,
    /// Sign ALL inputs and NO outputs.
    None = 0x02,
    /// Sign ALL inputs and the ONE output at the input's index.
    Single = 0x03,
    /// Sign ONE input and ALL outputs.
    AllAcp = 0x81,
    /// Sign ONE input and NO outputs.
    NoneAcp = 0x82,
    /// Sign ONE input and ONE output.
    SingleAcp = 0x83,
}

impl Sighash {
    /// Convert a flag byte into a Sighash, tolerating (and discarding) the
    /// fork-id bit.
    pub fn from_u8(flag: u8) -> TxResult<Self> {
        match (flag & !SIGHASH_FORKID) & 0x9f {
            0x01 => Ok(Sighash::All),
            0x02 => Ok(Sighash::None),
            0x03 => Ok(Sighash::Single),
            0x81 => Ok(Sighash::AllAcp),
            0x82 => Ok(Sighash::NoneAcp),
            0x83 => Ok(Sighash::SingleAcp),
            _ => Err(TxError::UnknownSighash(flag)),
        }
    }

    /// The base mode: 1, 2, or 3.
    pub fn base(&self) -> u8 {
        *self as u8 & 0x1f
    }

    /// True for the ANYONECANPAY variants.
    pub fn is_anyone_can_pay(&self) -> bool {
        *self as u8 & 0x80 == 0x80
    }

    /// The byte appended to a signature on the wire. Carries the fork-id
    /// bit when the coin requires it.
    pub fn wire_byte(&self, fork_id: bool) -> u8 {
        if fork_id {
            *self as u8 | SIGHASH_FORKID
        } else {
            *self as u8
        }
    }
}

/// Arguments required to compute a legacy (pre-segwit) sighash.
///
/// After signing the digest, the sighash indicator byte MUST be appended to
/// the resulting signature.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LegacySighashArgs<'a> {
    /// The index of the input being signed.
    pub index: usize,
    /// The sighash mode.
    pub sighash_flag: Sighash,
    /// The subscript: the prevout's locking script for p2pkh, the redeem
    /// script for p2sh.
    pub prevout_script: &'a Script,
}

/// Arguments required to compute a BIP143 (witness) sighash, or the BCH
/// fork-id sighash which shares the same preimage shape.
///
/// After signing the digest, the sighash indicator byte MUST be appended to
/// the resulting signature.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WitnessSighashArgs<'a> {
    /// The index of the input being signed.
    pub index: usize,
    /// The sighash mode.
    pub sighash_flag: Sighash,
    /// The script code. For p2wpkh this is the synthesized p2pkh-style
    /// script of the witness public key.
    pub prevout_script: &'a Script,
    /// The value of the prevout in satoshis. BIP143 commits to it.
    pub prevout_value: u64,
}

/// A transaction. The witness vector is either empty (legacy) or carries
/// exactly one stack per input. The marker and flag bytes appear on the
/// wire iff at least one stack is non-empty.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Transaction {
    /// The version number. Usually 1 or 2.
    pub version: u32,
    /// The vector of inputs.
    pub vin: Vec<TxIn>,
    /// The vector of outputs.
    pub vout: Vec<TxOut>,
    /// Per-input witness stacks. Empty until a witness input is signed.
    pub witnesses: Vec<Witness>,
    /// The nLocktime field.
    pub locktime: u32,
}

impl Transaction {
    /// Instantiate a new transaction with no witnesses.
    pub fn new<I, O>(version: u32, vin: I, vout: O, locktime: u32) -> Self
    where
        I: Into<Vec<TxIn>>,
        O: Into<Vec<TxOut>>,
    {
        Self {
            version,
            vin: vin.into(),
            vout: vout.into(),
            witnesses: vec![],
            locktime,
        }
    }

    /// True if any input carries a non-empty witness stack, i.e. iff the
    /// serialization uses the BIP141 layered format.
    pub fn has_witness(&self) -> bool {
        self.witnesses.iter().any(|w| !w.is_empty())
    }

    /// True if input `index` carries either a non-empty script sig or a
    /// non-empty witness.
    pub fn input_signed(&self, index: usize) -> bool {
        let script = self
            .vin
            .get(index)
            .map(|txin| !txin.script_sig.is_empty())
            .unwrap_or(false);
        let witness = self
            .witnesses
            .get(index)
            .map(|w| !w.is_empty())
            .unwrap_or(false);
        script || witness
    }

    /// Set the script sig of input `index`.
    pub fn set_script_sig(&mut self, index: usize, script_sig: ScriptSig) {
        self.vin[index].script_sig = script_sig;
    }

    /// Set the witness stack of input `index`, growing the witness vector
    /// to one (possibly empty) stack per input as needed.
    pub fn set_witness(&mut self, index: usize, witness: Witness) {
        if self.witnesses.len() < self.vin.len() {
            self.witnesses.resize(self.vin.len(), Witness::default());
        }
        self.witnesses[index] = witness;
    }

    /// The transaction id: double-SHA-256 of the legacy serialization.
    pub fn txid(&self) -> TXID {
        let mut w = Hash256Writer::default();
        self.write_legacy(&mut w).expect("no IOError from SHA2");
        w.finish_marked()
    }

    /// The witness transaction id: double-SHA-256 of the BIP141
    /// serialization. Equal to the txid when there are no witnesses.
    pub fn wtxid(&self) -> WTXID {
        let mut w = Hash256Writer::default();
        if self.has_witness() {
            self.write_witness_format(&mut w)
                .expect("no IOError from SHA2");
        } else {
            self.write_legacy(&mut w).expect("no IOError from SHA2");
        }
        w.finish_marked()
    }

    fn write_legacy<W: Write>(&self, writer: &mut W) -> TxResult<usize> {
        let mut len = Self::write_u32_le(writer, self.version)?;
        len += write_prefix_vec(writer, &self.vin)?;
        len += write_prefix_vec(writer, &self.vout)?;
        len += Self::write_u32_le(writer, self.locktime)?;
        Ok(len)
    }

    fn write_witness_format<W: Write>(&self, writer: &mut W) -> TxResult<usize> {
        if self.witnesses.len() != self.vin.len() {
            return Err(TxError::WitnessCountMismatch {
                expected: self.vin.len(),
                got: self.witnesses.len(),
            });
        }
        let mut len = Self::write_u32_le(writer, self.version)?;
        writer.write_all(&[0x00, 0x01])?;
        len += 2;
        len += write_prefix_vec(writer, &self.vin)?;
        len += write_prefix_vec(writer, &self.vout)?;
        for witness in &self.witnesses {
            len += write_compact_int(writer, witness.len() as u64)?;
            for item in witness {
                len += item.write_to(writer)?;
            }
        }
        len += Self::write_u32_le(writer, self.locktime)?;
        Ok(len)
    }

    /// Performs the legacy sighash input substitution: every script sig is
    /// cleared except the signed input's, which is replaced by the
    /// subscript. `OP_CODESEPARATOR` handling is not provided.
    fn legacy_sighash_prep(&self, index: usize, prevout_script: &Script) -> Self {
        let mut copy_tx = self.clone();
        copy_tx.witnesses = vec![];
        for (i, txin) in copy_tx.vin.iter_mut().enumerate() {
            txin.script_sig = if i == index {
                ScriptSig::from(prevout_script.items())
            } else {
                ScriptSig::null()
            };
        }
        copy_tx
    }

    /// Modifies a sighash copy according to legacy SIGHASH_SINGLE: outputs
    /// after the signed index are dropped, earlier ones are nulled, and
    /// other inputs' sequence numbers are zeroed.
    fn legacy_sighash_single(copy_tx: &mut Self, index: usize) {
        let mut outputs: Vec<TxOut> = (0..index).map(|_| TxOut::null()).collect();
        outputs.push(copy_tx.vout[index].clone());
        copy_tx.vout = outputs;
        for (i, txin) in copy_tx.vin.iter_mut().enumerate() {
            if i != index {
                txin.sequence = 0;
            }
        }
    }

    /// Modifies a sighash copy according to legacy SIGHASH_NONE: all
    /// outputs are dropped and other inputs' sequence numbers are zeroed.
    fn legacy_sighash_none(copy_tx: &mut Self, index: usize) {
        copy_tx.vout = vec![];
        for (i, txin) in copy_tx.vin.iter_mut().enumerate() {
            if i != index {
                txin.sequence = 0;
            }
        }
    }

    /// Modifies a sighash copy according to legacy ANYONECANPAY: only the
    /// signed input remains.
    fn legacy_sighash_anyone_can_pay(copy_tx: &mut Self, index: usize) {
        copy_tx.vin = vec![copy_tx.vin[index].clone()];
    }

    /// Write the legacy sighash preimage to `writer`.
    pub fn write_legacy_sighash_preimage<W: Write>(
        &self,
        writer: &mut W,
        args: &LegacySighashArgs,
    ) -> TxResult<()> {
        let mut copy_tx = self.legacy_sighash_prep(args.index, args.prevout_script);
        match args.sighash_flag.base() {
            0x02 => Self::legacy_sighash_none(&mut copy_tx, args.index),
            0x03 => {
                if args.index >= self.vout.len() {
                    return Err(TxError::SighashSingleBug(args.index));
                }
                Self::legacy_sighash_single(&mut copy_tx, args.index);
            }
            _ => {}
        }

        if args.sighash_flag.is_anyone_can_pay() {
            Self::legacy_sighash_anyone_can_pay(&mut copy_tx, args.index);
        }

        copy_tx.write_legacy(writer)?;
        Self::write_u32_le(writer, args.sighash_flag as u32)?;
        Ok(())
    }

    /// Calculate the legacy sighash digest.
    pub fn legacy_sighash(&self, args: &LegacySighashArgs) -> TxResult<Hash256Digest> {
        let mut w = Hash256Writer::default();
        self.write_legacy_sighash_preimage(&mut w, args)?;
        Ok(w.finish())
    }

    /// `hash_prevouts` per BIP143. All zeros under ANYONECANPAY.
    fn hash_prevouts(&self, sighash_flag: Sighash) -> TxResult<Hash256Digest> {
        if sighash_flag.is_anyone_can_pay() {
            return Ok(Hash256Digest::default());
        }
        let mut w = Hash256Writer::default();
        for txin in &self.vin {
            txin.outpoint.write_to(&mut w)?;
        }
        Ok(w.finish())
    }

    /// `hash_sequence` per BIP143. All zeros when masked by the mode.
    fn hash_sequence(&self, sighash_flag: Sighash) -> TxResult<Hash256Digest> {
        if sighash_flag.is_anyone_can_pay() || sighash_flag.base() != 0x01 {
            return Ok(Hash256Digest::default());
        }
        let mut w = Hash256Writer::default();
        for txin in &self.vin {
            Self::write_u32_le(&mut w, txin.sequence)?;
        }
        Ok(w.finish())
    }

    /// `hash_outputs` per BIP143. Commits to all outputs, the matching
    /// output, or nothing, depending on the mode.
    fn hash_outputs(&self, index: usize, sighash_flag: Sighash) -> TxResult<Hash256Digest> {
        match sighash_flag.base() {
            0x01 => {
                let mut w = Hash256Writer::default();
                for output in &self.vout {
                    output.write_to(&mut w)?;
                }
                Ok(w.finish())
            }
            0x03 => {
                let mut w = Hash256Writer::default();
                self.vout[index].write_to(&mut w)?;
                Ok(w.finish())
            }
            _ => Ok(Hash256Digest::default()),
        }
    }

    fn write_witness_preimage<W: Write>(
        &self,
        writer: &mut W,
        args: &WitnessSighashArgs,
        hash_type: u32,
    ) -> TxResult<()> {
        if args.sighash_flag.base() == 0x03 && args.index >= self.vout.len() {
            return Err(TxError::SighashSingleBug(args.index));
        }

        let txin = &self.vin[args.index];

        Self::write_u32_le(writer, self.version)?;
        writer.write_all(&self.hash_prevouts(args.sighash_flag)?)?;
        writer.write_all(&self.hash_sequence(args.sighash_flag)?)?;
        txin.outpoint.write_to(writer)?;
        args.prevout_script.write_to(writer)?;
        Self::write_u64_le(writer, args.prevout_value)?;
        Self::write_u32_le(writer, txin.sequence)?;
        writer.write_all(&self.hash_outputs(args.index, args.sighash_flag)?)?;
        Self::write_u32_le(writer, self.locktime)?;
        Self::write_u32_le(writer, hash_type)?;
        Ok(())
    }

    /// Write the BIP143 sighash preimage to `writer`.
    pub fn write_witness_sighash_preimage<W: Write>(
        &self,
        writer: &mut W,
        args: &WitnessSighashArgs,
    ) -> TxResult<()> {
        self.write_witness_preimage(writer, args, args.sighash_flag as u32)
    }

    /// Calculate the BIP143 sighash digest.
    pub fn witness_sighash(&self, args: &WitnessSighashArgs) -> TxResult<Hash256Digest> {
        let mut w = Hash256Writer::default();
        self.write_witness_sighash_preimage(&mut w, args)?;
        Ok(w.finish())
    }

    /// Write the BCH fork-id sighash preimage: the BIP143 shape with the
    /// fork-id bit set and the fork id carried in the high 3 bytes of the
    /// appended hash type.
    pub fn write_forkid_sighash_preimage<W: Write>(
        &self,
        writer: &mut W,
        args: &WitnessSighashArgs,
        fork_id: u32,
    ) -> TxResult<()> {
        let hash_type =
            (fork_id << 8) | (args.sighash_flag.wire_byte(true) as u32);
        self.write_witness_preimage(writer, args, hash_type)
    }

    /// Calculate the BCH fork-id sighash digest. Applies to *all* BCH
    /// inputs, legacy prevouts included.
    pub fn forkid_sighash(
        &self,
        args: &WitnessSighashArgs,
        fork_id: u32,
    ) -> TxResult<Hash256Digest> {
        let mut w = Hash256Writer::default();
        self.write_forkid_sighash_preimage(&mut w, args, fork_id)?;
        Ok(w.finish())
    }
}

impl ByteFormat for Transaction {
    type Error = TxError;

    fn serialized_length(&self) -> usize {
        let mut len = 4; // version
        len += multicoins_core::ser::prefix_byte_len(self.vin.len() as u64);
        len += self.vin.iter().map(|i| i.serialized_length()).sum::<usize>();
        len += multicoins_core::ser::prefix_byte_len(self.vout.len() as u64);
        len += self.vout.iter().map(|o| o.serialized_length()).sum::<usize>();
        if self.has_witness() {
            len += 2; // marker and flag
            for witness in &self.witnesses {
                len += multicoins_core::ser::prefix_byte_len(witness.len() as u64);
                len += witness.iter().map(|i| i.serialized_length()).sum::<usize>();
            }
        }
        len += 4; // locktime
        len
    }

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, Self::Error> {
        let version = Self::read_u32_le(reader)?;

        // peek at the byte after the version: a zero marker means the
        // BIP141 layered format, since no valid legacy tx has zero inputs
        let first = Self::read_u8(reader)?;
        if first == 0x00 {
            let flag = Self::read_u8(reader)?;
            if flag != 0x01 {
                return Err(TxError::BadWitnessFlag(flag));
            }
            let vin: Vec<TxIn> = read_prefix_vec(reader)?;
            let vout: Vec<TxOut> = read_prefix_vec(reader)?;
            let mut witnesses = Vec::with_capacity(vin.len());
            for _ in 0..vin.len() {
                let stack_size = read_compact_int(reader)?;
                let mut stack = Vec::with_capacity((stack_size as usize).min(0x100));
                for _ in 0..stack_size {
                    stack.push(WitnessStackItem::read_from(reader)?);
                }
                witnesses.push(stack);
            }
            let locktime = Self::read_u32_le(reader)?;

            let tx = Self {
                version,
                vin,
                vout,
                witnesses,
                locktime,
            };
            if !tx.has_witness() {
                return Err(TxError::WitnessFlagNoWitness);
            }
            Ok(tx)
        } else {
            let n_in = read_compact_int_tail(reader, first)?;
            let mut vin = Vec::with_capacity((n_in as usize).min(0x1000));
            for _ in 0..n_in {
                vin.push(TxIn::read_from(reader)?);
            }
            let vout: Vec<TxOut> = read_prefix_vec(reader)?;
            let locktime = Self::read_u32_le(reader)?;
            Ok(Self {
                version,
                vin,
                vout,
                witnesses: vec![],
                locktime,
            })
        }
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize, Self::Error> {
        if self.has_witness() {
            self.write_witness_format(writer)
        } else {
            self.write_legacy(writer)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::txin::Outpoint;

    // pulled from a mainnet p2pkh spend
    const LEGACY_TX: &str = "0100000001813f79011acb80925dfe69b3def355fe914bd1d96a3f5f71bf8303c6a989c7d1000000006b483045022100ed81ff192e75a3fd2304004dcadb746fa5e24c5031ccfcf21320b0277457c98f02207a986d955c6e0cb35d446a89d3f56100f4d7f67801c31967743a9c8e10615bed01210349fc4e631e3624a545de3f89f5d8684c7b8138bd94bdd531d2e213bf016b278afeffffff02a135ef01000000001976a914bc3b654dca7e56b04dca18f2566cdaf02e8d9ada88ac99c39800000000001976a9141c4bc762dd5423e332166702cb75f40df79fea1288ac19430600";

    // the same testnet spend in its legacy form; its BIP143 digests are
    // checked against independently generated vectors
    const WITNESS_TX_LEGACY_FORM: &str = "0200000001ee9242c89e79ab2aa537408839329895392b97505b3496d5543d6d2f531b94d20000000000fdffffff0173d301000000000017a914bba5acbec4e6e3374a0345bf3609fa7cfea825f187cafd0700";

    const TWO_INPUT_WITNESS_LEGACY_FORM: &str = "0200000002ee9242c89e79ab2aa537408839329895392b97505b3496d5543d6d2f531b94d20000000000fdffffffee9242c89e79ab2aa537408839329895392b97505b3496d5543d6d2f531b94d20000000000fdffffff0273d301000000000017a914bba5acbec4e6e3374a0345bf3609fa7cfea825f18773d301000000000017a914bba5acbec4e6e3374a0345bf3609fa7cfea825f187cafd0700";

    const PREVOUT_SCRIPT: &str = "160014758ce550380d964051086798d6546bebdca27a73";

    fn digest(hex_str: &str) -> Hash256Digest {
        let mut digest = Hash256Digest::default();
        digest.copy_from_slice(&hex::decode(hex_str).unwrap());
        digest
    }

    #[test]
    fn it_calculates_legacy_sighashes_and_txids() {
        let tx = Transaction::deserialize_hex(LEGACY_TX).unwrap();
        assert_eq!(tx.serialize_hex(), LEGACY_TX);

        let prevout_script =
            Script::deserialize_hex("17a91424d6008f143af0cca57344069c46661aa4fcea2387").unwrap();

        assert_eq!(
            tx.txid(),
            TXID::deserialize_hex("03ee4f7a4e68f802303bc659f8f817964b4b74fe046facc3ae1be4679d622c45")
                .unwrap()
        );

        let mut args = LegacySighashArgs {
            index: 0,
            sighash_flag: Sighash::All,
            prevout_script: &prevout_script,
        };
        assert_eq!(
            tx.legacy_sighash(&args).unwrap(),
            digest("b85c4f8d1377cc138225dd9b319d0a4ca547f7884270640f44c5fcdf269e0fe8")
        );
        args.sighash_flag = Sighash::AllAcp;
        assert_eq!(
            tx.legacy_sighash(&args).unwrap(),
            digest("3b67a5114cc9fc837ddd6f6ec11bde38db5f68c34ab6ece2a043d7b25f2cf8bb")
        );
        args.sighash_flag = Sighash::Single;
        assert_eq!(
            tx.legacy_sighash(&args).unwrap(),
            digest("1dab67d768be0380fc800098005d1f61744ffe585b0852f8d7adc12121a86938")
        );
        args.sighash_flag = Sighash::SingleAcp;
        assert_eq!(
            tx.legacy_sighash(&args).unwrap(),
            digest("d4687b93c0a9090dc0a3384cd3a594ce613834bb37abc56f6032e96c597547e3")
        );
    }

    #[test]
    fn it_calculates_witness_sighashes_and_txids() {
        let tx = Transaction::deserialize_hex(WITNESS_TX_LEGACY_FORM).unwrap();
        let prevout_script = Script::deserialize_hex(PREVOUT_SCRIPT).unwrap();

        assert_eq!(
            tx.txid(),
            TXID::deserialize_hex("9e77087321b870859ebf08976d665c42d9f98cad18fff6a05a91c1d2da6d6c41")
                .unwrap()
        );

        let mut args = WitnessSighashArgs {
            index: 0,
            sighash_flag: Sighash::All,
            prevout_script: &prevout_script,
            prevout_value: 120000,
        };
        assert_eq!(
            tx.witness_sighash(&args).unwrap(),
            digest("135754ab872e4943f7a9c30d6143c4c7187e33d0f63c75ec82a7f9a15e2f2d00")
        );
        args.sighash_flag = Sighash::AllAcp;
        assert_eq!(
            tx.witness_sighash(&args).unwrap(),
            digest("cc7438d5b15e93ba612dcd227cf1937c35273675b3aa7d1b771573667376ddf6")
        );
        args.sighash_flag = Sighash::Single;
        assert_eq!(
            tx.witness_sighash(&args).unwrap(),
            digest("d04631d2742e6fd8e80e2e4309dece65becca41d37fd6bc0bcba041c52d824d5")
        );
        args.sighash_flag = Sighash::SingleAcp;
        assert_eq!(
            tx.witness_sighash(&args).unwrap(),
            digest("ffea9cdda07170af9bc9967cedf485e9fe15b78a622e0c196c0b6fc64f40c615")
        );
    }

    #[test]
    fn it_passes_more_witness_sighash_tests() {
        let tx = Transaction::deserialize_hex(TWO_INPUT_WITNESS_LEGACY_FORM).unwrap();
        let prevout_script = Script::deserialize_hex(PREVOUT_SCRIPT).unwrap();

        assert_eq!(
            tx.txid(),
            TXID::deserialize_hex("184e7bce099679b27ed958213c97d2fb971e227c6517bca11f06ccbb97dcdc30")
                .unwrap()
        );

        let mut args = WitnessSighashArgs {
            index: 1,
            sighash_flag: Sighash::All,
            prevout_script: &prevout_script,
            prevout_value: 120000,
        };
        assert_eq!(
            tx.witness_sighash(&args).unwrap(),
            digest("75385c87ece4980b581cfd71bc5814f607801a87f6e0973c63dc9fda465c19c4")
        );
        args.sighash_flag = Sighash::AllAcp;
        assert_eq!(
            tx.witness_sighash(&args).unwrap(),
            digest("bc55c4303c82cdcc8e290c597a00d662ab34414d79ec15d63912b8be7fe2ca3c")
        );
        args.sighash_flag = Sighash::Single;
        assert_eq!(
            tx.witness_sighash(&args).unwrap(),
            digest("9d57bf7af01a4e0baa57e749aa193d37a64e3bbc08eb88af93944f41af8dfc70")
        );
        args.sighash_flag = Sighash::SingleAcp;
        assert_eq!(
            tx.witness_sighash(&args).unwrap(),
            digest("ffea9cdda07170af9bc9967cedf485e9fe15b78a622e0c196c0b6fc64f40c615")
        );
    }

    #[test]
    fn it_passes_more_legacy_sighash_tests() {
        let tx_hex = "0200000002ee9242c89e79ab2aa537408839329895392b97505b3496d5543d6d2f531b94d20000000000fdffffffee9242c89e79ab2aa537408839329895392b97505b3496d5543d6d2f531b94d20000000000fdffffff0273d301000000000017a914bba5acbec4e6e3374a0345bf3609fa7cfea825f18773d301000000000017a914bba5acbec4e6e3374a0345bf3609fa7cfea825f18700000000";
        let tx = Transaction::deserialize_hex(tx_hex).unwrap();
        let prevout_script = Script::deserialize_hex(PREVOUT_SCRIPT).unwrap();

        assert_eq!(
            tx.txid(),
            TXID::deserialize_hex("40157948972c5c97a2bafff861ee2f8745151385c7f9fbd03991ddf59b76ac81")
                .unwrap()
        );

        let mut args = LegacySighashArgs {
            index: 1,
            sighash_flag: Sighash::All,
            prevout_script: &prevout_script,
        };
        assert_eq!(
            tx.legacy_sighash(&args).unwrap(),
            digest("3ab40bf1287b7be9a5c67ed0f97f80b38c5f68e53ec93bffd3893901eaaafdb2")
        );
        args.sighash_flag = Sighash::AllAcp;
        assert_eq!(
            tx.legacy_sighash(&args).unwrap(),
            digest("2d5802fed31e1ef6a857346cc0a9085ea452daeeb3a0b5afcb16a2203ce5689d")
        );
        args.sighash_flag = Sighash::Single;
        assert_eq!(
            tx.legacy_sighash(&args).unwrap(),
            digest("ea52b62b26c1f0db838c952fa50806fb8e39ba4c92a9a88d1b4ba7e9c094517d")
        );
        args.sighash_flag = Sighash::SingleAcp;
        assert_eq!(
            tx.legacy_sighash(&args).unwrap(),
            digest("9e2aca0a04afa6e1e5e00ff16b06a247a0da1e7bbaa7cd761c066a82bb3b07d0")
        );
    }

    #[test]
    fn it_round_trips_the_witness_format() {
        let mut tx = Transaction::deserialize_hex(WITNESS_TX_LEGACY_FORM).unwrap();
        assert!(!tx.has_witness());

        tx.set_witness(
            0,
            vec![
                WitnessStackItem::new(vec![0xaa; 71]),
                WitnessStackItem::new(vec![0xbb; 33]),
            ],
        );
        assert!(tx.has_witness());

        let round_tripped = Transaction::deserialize_hex(&tx.serialize_hex()).unwrap();
        assert_eq!(round_tripped, tx);
        assert_eq!(round_tripped.serialized_length(), tx.serialize_hex().len() / 2);

        // witness data never changes the txid, only the wtxid
        let mut legacy_twin = tx.clone();
        legacy_twin.witnesses = vec![];
        assert_eq!(tx.txid(), legacy_twin.txid());
        assert_ne!(
            <WTXID as Into<Hash256Digest>>::into(tx.wtxid()),
            <TXID as Into<Hash256Digest>>::into(tx.txid())
        );
    }

    #[test]
    fn it_rejects_malformed_witness_structure() {
        // marker and flag with an empty witness stack for the only input
        let all_empty = "02000000000101ee9242c89e79ab2aa537408839329895392b97505b3496d5543d6d2f531b94d20000000000fdffffff0173d301000000000017a914bba5acbec4e6e3374a0345bf3609fa7cfea825f18700cafd0700";
        match Transaction::deserialize_hex(all_empty) {
            Err(TxError::WitnessFlagNoWitness) => {}
            other => panic!("expected WitnessFlagNoWitness, got {:?}", other),
        }

        // bad flag byte
        let bad_flag = "020000000002";
        match Transaction::deserialize_hex(bad_flag) {
            Err(TxError::BadWitnessFlag(0x02)) => {}
            other => panic!("expected BadWitnessFlag, got {:?}", other),
        }

        // truncated input vector
        assert!(Transaction::deserialize_hex("010000000102").is_err());
    }

    #[test]
    fn it_carries_fork_id_in_the_hash_type() {
        let tx = Transaction::deserialize_hex(WITNESS_TX_LEGACY_FORM).unwrap();
        let prevout_script = Script::deserialize_hex(PREVOUT_SCRIPT).unwrap();
        let args = WitnessSighashArgs {
            index: 0,
            sighash_flag: Sighash::All,
            prevout_script: &prevout_script,
            prevout_value: 120000,
        };

        let mut forkid_preimage = vec![];
        tx.write_forkid_sighash_preimage(&mut forkid_preimage, &args, 0)
            .unwrap();
        // the appended u32 is (fork_id << 8) | (flag | 0x40)
        assert_eq!(&forkid_preimage[forkid_preimage.len() - 4..], &[0x41, 0, 0, 0]);

        let mut plain_preimage = vec![];
        tx.write_witness_sighash_preimage(&mut plain_preimage, &args)
            .unwrap();
        assert_eq!(
            &plain_preimage[..plain_preimage.len() - 4],
            &forkid_preimage[..forkid_preimage.len() - 4]
        );
        assert_ne!(
            tx.witness_sighash(&args).unwrap(),
            tx.forkid_sighash(&args, 0).unwrap()
        );
    }

    #[test]
    fn it_errors_on_the_sighash_single_bug() {
        let tx = Transaction::new(
            1,
            vec![TxIn::unsigned(Outpoint::null()), TxIn::unsigned(Outpoint::null())],
            vec![TxOut::new(1000, vec![])],
            0,
        );
        let prevout_script = Script::null();
        let args = LegacySighashArgs {
            index: 1,
            sighash_flag: Sighash::Single,
            prevout_script: &prevout_script,
        };
        match tx.legacy_sighash(&args) {
            Err(TxError::SighashSingleBug(1)) => {}
            other => panic!("expected SighashSingleBug, got {:?}", other),
        }
    }
}
