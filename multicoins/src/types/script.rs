//! Script types for UTXO chains. Scripts are opaque, wrapped `Vec<u8>`
//! instances; this crate does not execute Script. The only semantics here
//! are the standard output templates and their classification, which is an
//! exact pattern match on byte shapes.

use multicoins_bip32::Pubkey;
use multicoins_core::hashes::{hash160, Hash160Digest};
use multicoins_core::{impl_script_conversion, wrap_prefixed_byte_vector};

/// The opcodes needed to emit and parse the standard templates.
pub mod op {
    /// Push an empty array (also the CHECKMULTISIG dummy).
    pub const OP_0: u8 = 0x00;
    /// Push the next 1-75 bytes literally: the opcode *is* the length.
    pub const OP_PUSHDATA1: u8 = 0x4c;
    /// Push with a 2-byte little-endian length.
    pub const OP_PUSHDATA2: u8 = 0x4d;
    /// Push with a 4-byte little-endian length.
    pub const OP_PUSHDATA4: u8 = 0x4e;
    /// Push the number 1. `OP_1` through `OP_16` are consecutive.
    pub const OP_1: u8 = 0x51;
    /// Push the number 16.
    pub const OP_16: u8 = 0x60;
    /// Duplicate the top stack item.
    pub const OP_DUP: u8 = 0x76;
    /// Pop, hash160, push.
    pub const OP_HASH160: u8 = 0xa9;
    /// Equality check leaving a boolean.
    pub const OP_EQUAL: u8 = 0x87;
    /// Equality check that aborts on mismatch.
    pub const OP_EQUALVERIFY: u8 = 0x88;
    /// Signature check.
    pub const OP_CHECKSIG: u8 = 0xac;
    /// k-of-n signature check.
    pub const OP_CHECKMULTISIG: u8 = 0xae;
}

wrap_prefixed_byte_vector!(
    /// An opaque script, used where the kind does not matter (e.g. redeem
    /// scripts and sighash subscripts).
    Script
);
wrap_prefixed_byte_vector!(
    /// The spend-authorization script carried by an input.
    ScriptSig
);
wrap_prefixed_byte_vector!(
    /// The locking script carried by an output.
    ScriptPubkey
);
wrap_prefixed_byte_vector!(
    /// One element of a witness stack.
    WitnessStackItem
);

impl_script_conversion!(Script, ScriptPubkey);
impl_script_conversion!(Script, ScriptSig);
impl_script_conversion!(ScriptPubkey, ScriptSig);

/// A single input's witness: a stack of byte strings. The transaction's
/// witness vector holds one of these per input, *without* a length prefix of
/// its own.
pub type Witness = Vec<WitnessStackItem>;

/// Append a minimal push of `data` to `buf`.
pub fn push_data(buf: &mut Vec<u8>, data: &[u8]) {
    match data.len() {
        0 => buf.push(op::OP_0),
        1..=0x4b => {
            buf.push(data.len() as u8);
            buf.extend_from_slice(data);
        }
        0x4c..=0xff => {
            buf.push(op::OP_PUSHDATA1);
            buf.push(data.len() as u8);
            buf.extend_from_slice(data);
        }
        0x100..=0xffff => {
            buf.push(op::OP_PUSHDATA2);
            buf.extend_from_slice(&(data.len() as u16).to_le_bytes());
            buf.extend_from_slice(data);
        }
        _ => {
            buf.push(op::OP_PUSHDATA4);
            buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
            buf.extend_from_slice(data);
        }
    }
}

impl ScriptPubkey {
    /// The standard p2pkh locking script for a key hash.
    pub fn p2pkh_from_hash(digest: Hash160Digest) -> Self {
        let mut v: Vec<u8> = vec![op::OP_DUP, op::OP_HASH160, 0x14];
        v.extend(digest);
        v.extend([op::OP_EQUALVERIFY, op::OP_CHECKSIG]);
        v.into()
    }

    /// The standard p2pkh locking script for a public key, honoring its
    /// compression form.
    pub fn p2pkh(key: &Pubkey) -> Self {
        Self::p2pkh_from_hash(key.hash160())
    }

    /// The standard p2sh locking script for a script hash.
    pub fn p2sh_from_hash(digest: Hash160Digest) -> Self {
        let mut v: Vec<u8> = vec![op::OP_HASH160, 0x14];
        v.extend(digest);
        v.extend([op::OP_EQUAL]);
        v.into()
    }

    /// The standard p2sh locking script for a redeem script.
    pub fn p2sh(script: &Script) -> Self {
        Self::p2sh_from_hash(hash160(script.items()))
    }

    /// The v0 witness locking script for a key hash.
    pub fn p2wpkh_from_hash(digest: Hash160Digest) -> Self {
        let mut v: Vec<u8> = vec![op::OP_0, 0x14];
        v.extend(digest);
        v.into()
    }

    /// The v0 witness locking script for a public key. Witness programs
    /// always commit to the compressed form.
    pub fn p2wpkh(key: &Pubkey) -> Self {
        Self::p2wpkh_from_hash(hash160(&key.key.serialize()))
    }

    /// Inspect the script to determine its standard type.
    pub fn standard_type(&self) -> ScriptType {
        let items = &self.0;
        match items.len() {
            0x19 => {
                if items[0..3] == [op::OP_DUP, op::OP_HASH160, 0x14]
                    && items[0x17..] == [op::OP_EQUALVERIFY, op::OP_CHECKSIG]
                {
                    let mut buf = [0u8; 20];
                    buf.copy_from_slice(&items[3..23]);
                    return ScriptType::Pkh(buf);
                }
            }
            0x17 => {
                if items[0..2] == [op::OP_HASH160, 0x14] && items[0x16..] == [op::OP_EQUAL] {
                    let mut buf = [0u8; 20];
                    buf.copy_from_slice(&items[2..22]);
                    return ScriptType::Sh(buf);
                }
            }
            0x16 => {
                if items[0..2] == [op::OP_0, 0x14] {
                    let mut buf = [0u8; 20];
                    buf.copy_from_slice(&items[2..22]);
                    return ScriptType::Wpkh(buf);
                }
            }
            _ => return ScriptType::NonStandard,
        }
        ScriptType::NonStandard
    }
}

impl Script {
    /// The redeem script nesting a v0 witness program inside p2sh:
    /// `OP_0 0x14 <hash160(pubkey)>`.
    pub fn nested_witness_redeem(key: &Pubkey) -> Self {
        let spk = ScriptPubkey::p2wpkh(key);
        Self::new(spk.items().to_vec())
    }

    /// A bare k-of-n CHECKMULTISIG redeem script. Caller is responsible for
    /// `1 <= k <= n <= 16` and for the ordering of `pubkeys`, which fixes the
    /// required signature order.
    pub fn multisig(k: u8, pubkeys: &[Pubkey]) -> Self {
        debug_assert!(k as usize <= pubkeys.len() && !pubkeys.is_empty());
        let mut v = vec![op::OP_1 + k - 1];
        for key in pubkeys {
            push_data(&mut v, &key.serialize_vec());
        }
        v.push(op::OP_1 + pubkeys.len() as u8 - 1);
        v.push(op::OP_CHECKMULTISIG);
        Self::new(v)
    }

    /// Parse a CHECKMULTISIG redeem script into `(k, pubkeys)`. Returns
    /// `None` for anything that is not the exact template.
    pub fn parse_multisig(&self) -> Option<(u8, Vec<Vec<u8>>)> {
        let items = &self.0;
        if items.len() < 4 || *items.last()? != op::OP_CHECKMULTISIG {
            return None;
        }
        if !(op::OP_1..=op::OP_16).contains(&items[0]) {
            return None;
        }
        let k = items[0] - op::OP_1 + 1;

        let mut keys = vec![];
        let mut cursor = 1usize;
        while cursor < items.len() - 2 {
            let push = items[cursor] as usize;
            if !(1..=0x4b).contains(&push) || cursor + 1 + push > items.len() - 2 {
                return None;
            }
            keys.push(items[cursor + 1..cursor + 1 + push].to_vec());
            cursor += 1 + push;
        }

        let n_opcode = items[items.len() - 2];
        if !(op::OP_1..=op::OP_16).contains(&n_opcode) {
            return None;
        }
        let n = (n_opcode - op::OP_1 + 1) as usize;
        if n != keys.len() || (k as usize) > n {
            return None;
        }
        Some((k, keys))
    }
}

/// Standard locking script shapes, and a catch-all for everything else.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScriptType {
    /// Pay to pubkey hash.
    Pkh([u8; 20]),
    /// Pay to script hash.
    Sh([u8; 20]),
    /// Pay to v0 witness pubkey hash.
    Wpkh([u8; 20]),
    /// Nonstandard or unknown script. May be a newer witness version.
    NonStandard,
}

#[cfg(test)]
mod test {
    use super::*;
    use multicoins_bip32::Privkey;
    use multicoins_core::ser::ByteFormat;

    fn keys(count: usize) -> Vec<Pubkey> {
        (1..=count)
            .map(|i| {
                let mut scalar = [0u8; 32];
                scalar[31] = i as u8;
                let mut hex_key = hex::encode(scalar);
                hex_key.push_str("01");
                Privkey::from_hex(&hex_key).unwrap().pubkey()
            })
            .collect()
    }

    #[test]
    fn it_serializes_scripts_with_length_prefixes() {
        let cases = [
            (
                Script::new(hex::decode("0014758ce550380d964051086798d6546bebdca27a73").unwrap()),
                "160014758ce550380d964051086798d6546bebdca27a73",
                22,
            ),
            (Script::new(vec![]), "00", 0),
            (Script::null(), "00", 0),
        ];
        for case in cases.iter() {
            assert_eq!(case.0.serialize_hex(), case.1);
            assert_eq!(case.0.len(), case.2);
            assert_eq!(Script::deserialize_hex(case.1).unwrap(), case.0);
        }
    }

    #[test]
    fn it_classifies_standard_scripts() {
        let cases = [
            (
                "76a9140e5c3c8d420c7f11e88d76f7b860d471e6517a4488ac",
                ScriptType::Pkh([
                    14, 92, 60, 141, 66, 12, 127, 17, 232, 141, 118, 247, 184, 96, 212, 113, 230,
                    81, 122, 68,
                ]),
            ),
            (
                "a914e88869b88866281ab166541ad8aafba8f8aba47a87",
                ScriptType::Sh([
                    232, 136, 105, 184, 136, 102, 40, 26, 177, 102, 84, 26, 216, 170, 251, 168,
                    248, 171, 164, 122,
                ]),
            ),
            (
                "00141bf8a1831db5443b42a44f30a121d1b616d011ab",
                ScriptType::Wpkh([
                    27, 248, 161, 131, 29, 181, 68, 59, 66, 164, 79, 48, 161, 33, 209, 182, 22,
                    208, 17, 171,
                ]),
            ),
            // wrong last byte
            (
                "76a9140e5c3c8d420c7f11e88d76f7b860d471e6517a4488ad",
                ScriptType::NonStandard,
            ),
            // wrong first byte
            (
                "aa14e88869b88866281ab166541ad8aafba8f8aba47a87",
                ScriptType::NonStandard,
            ),
            // wrong witness program version
            (
                "01141bf8a1831db5443b42a44f30a121d1b616d011ab",
                ScriptType::NonStandard,
            ),
            ("0011223344", ScriptType::NonStandard),
        ];
        for (script_hex, expected) in cases.iter() {
            let script = ScriptPubkey::new(hex::decode(script_hex).unwrap());
            assert_eq!(script.standard_type(), *expected);
        }
    }

    #[test]
    fn it_builds_and_parses_multisig_redeems() {
        let pubkeys = keys(3);
        let redeem = Script::multisig(2, &pubkeys);

        let (k, parsed) = redeem.parse_multisig().unwrap();
        assert_eq!(k, 2);
        assert_eq!(parsed.len(), 3);
        for (parsed_key, key) in parsed.iter().zip(pubkeys.iter()) {
            assert_eq!(*parsed_key, key.serialize_vec());
        }

        // a p2pkh script is not multisig
        assert!(ScriptPubkey::p2pkh(&pubkeys[0])
            .standard_type()
            .eq(&ScriptType::Pkh(pubkeys[0].hash160())));
        let not_msig = Script::new(ScriptPubkey::p2pkh(&pubkeys[0]).items().to_vec());
        assert!(not_msig.parse_multisig().is_none());
    }

    #[test]
    fn it_emits_minimal_pushes() {
        let mut short = vec![];
        push_data(&mut short, &[0xaa; 10]);
        assert_eq!(short[0], 10);

        let mut long = vec![];
        push_data(&mut long, &[0xbb; 0x60]);
        assert_eq!(long[0], op::OP_PUSHDATA1);
        assert_eq!(long[1], 0x60);
    }
}
