//! The signing engine: sighash selection per input kind and coin policy,
//! DER signature emission, and script or witness assembly.
//!
//! Signing an already-signed input is a no-op, so `sign` may be called
//! repeatedly without disturbing existing signatures. A failed call leaves
//! the transaction exactly as it was.

use thiserror::Error;

use multicoins_bip32::{KeyError, Privkey, Pubkey};
use multicoins_core::hashes::Hash256Digest;

use crate::nets::CoinPolicy;
use crate::types::script::{
    op, push_data, Script, ScriptPubkey, ScriptSig, ScriptType, Witness, WitnessStackItem,
};
use crate::types::tx::{LegacySighashArgs, Sighash, Transaction, TxError, WitnessSighashArgs};
use crate::types::utxo::{SpendScript, Utxo};

/// Errors raised by the signing engine. A failed sign leaves the
/// transaction in its pre-call state.
#[derive(Debug, Error)]
pub enum SignError {
    /// The input index does not exist.
    #[error("input index {0} out of range")]
    BadIndex(usize),

    /// BIP143 and fork-id sighashes commit to the prevout value, so it must
    /// be supplied.
    #[error("input {0} requires its prevout value for witness or fork-id signing")]
    MissingPrevoutValue(usize),

    /// The redeem script is not a template this engine knows how to sign.
    #[error("no known spend template for input {0}")]
    UnknownTemplate(usize),

    /// The signing key's public key does not appear in the redeem script.
    #[error("signer's public key is not present in the redeem script")]
    PubkeyNotInRedeem,

    /// The supplied UTXO does not correspond to the input being signed.
    #[error("utxo outpoint does not match input {0}")]
    OutpointMismatch(usize),

    /// The outputs spend more than the declared inputs. Only detectable
    /// when every input's amount is supplied.
    #[error("outputs spend {outputs} sat but inputs only carry {inputs} sat")]
    ValueUnderflow {
        /// The sum of the declared input amounts.
        inputs: u64,
        /// The sum of the output values.
        outputs: u64,
    },

    /// Sighash construction failed.
    #[error(transparent)]
    Tx(#[from] TxError),

    /// A key-level failure.
    #[error(transparent)]
    Key(#[from] KeyError),
}

/// The script the sighash commits to for a given input kind: the p2pkh
/// locking script of the signing key for pubkey-hash spends (BIP143 uses
/// the compressed key), or the redeem script for script-hash spends.
fn script_code_for(key: &Privkey, spend: &SpendScript) -> Script {
    match spend {
        SpendScript::Pkh => Script::from(ScriptPubkey::p2pkh(&key.pubkey()).items()),
        SpendScript::Sh(redeem) => redeem.clone(),
        SpendScript::Wpkh | SpendScript::ShWpkh => {
            Script::from(ScriptPubkey::p2pkh(&key.pubkey_compressed()).items())
        }
    }
}

/// Compute the sighash for one input, selecting legacy, BIP143, or fork-id
/// construction from the input kind and the coin policy.
pub fn input_sighash(
    tx: &Transaction,
    index: usize,
    key: &Privkey,
    spend: &SpendScript,
    value: Option<u64>,
    flag: Sighash,
    policy: &CoinPolicy,
) -> Result<Hash256Digest, SignError> {
    if index >= tx.vin.len() {
        return Err(SignError::BadIndex(index));
    }
    let script_code = script_code_for(key, spend);

    // a fork id forces the BIP143 shape onto every input, legacy included
    if let Some(fork_id) = policy.fork_id {
        let value = value.ok_or(SignError::MissingPrevoutValue(index))?;
        let args = WitnessSighashArgs {
            index,
            sighash_flag: flag,
            prevout_script: &script_code,
            prevout_value: value,
        };
        return Ok(tx.forkid_sighash(&args, fork_id)?);
    }

    if spend.is_witness() {
        let value = value.ok_or(SignError::MissingPrevoutValue(index))?;
        let args = WitnessSighashArgs {
            index,
            sighash_flag: flag,
            prevout_script: &script_code,
            prevout_value: value,
        };
        Ok(tx.witness_sighash(&args)?)
    } else {
        let args = LegacySighashArgs {
            index,
            sighash_flag: flag,
            prevout_script: &script_code,
        };
        Ok(tx.legacy_sighash(&args)?)
    }
}

/// Sign one input of a transaction in place. Re-signing an already-signed
/// input is a no-op; signing a partially-signed multisig input merges the
/// new signature in redeem-script order.
pub fn sign_input(
    tx: &mut Transaction,
    index: usize,
    key: &Privkey,
    spend: &SpendScript,
    value: Option<u64>,
    flag: Sighash,
    policy: &CoinPolicy,
) -> Result<(), SignError> {
    if index >= tx.vin.len() {
        return Err(SignError::BadIndex(index));
    }

    match spend {
        SpendScript::Sh(redeem) => {
            if let Some((digest, _)) = nested_witness_hash(redeem) {
                sign_nested_witness(tx, index, key, value, flag, policy, digest)
            } else if redeem.parse_multisig().is_some() {
                sign_multisig(tx, index, key, redeem, value, flag, policy)
            } else {
                Err(SignError::UnknownTemplate(index))
            }
        }
        SpendScript::ShWpkh => {
            let redeem = Script::nested_witness_redeem(&key.pubkey_compressed());
            let (digest, _) = nested_witness_hash(&redeem).expect("synthesized redeem is v0");
            sign_nested_witness(tx, index, key, value, flag, policy, digest)
        }
        SpendScript::Wpkh => {
            if tx.input_signed(index) {
                return Ok(());
            }
            let digest =
                input_sighash(tx, index, key, &SpendScript::Wpkh, value, flag, policy)?;
            tx.set_witness(index, witness_stack(key, digest, flag, policy));
            Ok(())
        }
        SpendScript::Pkh => {
            if tx.input_signed(index) {
                return Ok(());
            }
            let digest = input_sighash(tx, index, key, &SpendScript::Pkh, value, flag, policy)?;
            let sig_blob = signature_blob(key, digest, flag, policy);

            let mut script = vec![];
            push_data(&mut script, &sig_blob);
            push_data(&mut script, &key.pubkey().serialize_vec());
            tx.set_script_sig(index, ScriptSig::new(script));
            Ok(())
        }
    }
}

/// Sign every input of a transaction against its UTXO. Equivalent to
/// sequential calls to [`sign_input`], provided as an atomic convenience.
pub fn sign_all(
    tx: &mut Transaction,
    key: &Privkey,
    utxos: &[Utxo],
    flag: Sighash,
    policy: &CoinPolicy,
) -> Result<(), SignError> {
    // with every amount declared, an output total above the input total can
    // only be a mistake; catch it before any signature lands
    if utxos.len() == tx.vin.len() {
        let inputs: u64 = utxos.iter().map(|u| u.value).sum();
        let outputs: u64 = tx.vout.iter().map(|o| o.value).sum();
        if outputs > inputs {
            return Err(SignError::ValueUnderflow { inputs, outputs });
        }
    }
    for (index, utxo) in utxos.iter().enumerate() {
        sign_utxo(tx, index, key, utxo, flag, policy)?;
    }
    Ok(())
}

/// Sign the input at `index` against its UTXO.
pub fn sign_utxo(
    tx: &mut Transaction,
    index: usize,
    key: &Privkey,
    utxo: &Utxo,
    flag: Sighash,
    policy: &CoinPolicy,
) -> Result<(), SignError> {
    if tx.vin.get(index).map(|txin| txin.outpoint) != Some(utxo.outpoint) {
        return Err(SignError::OutpointMismatch(index));
    }
    sign_input(tx, index, key, &utxo.spend, Some(utxo.value), flag, policy)
}

/// The DER signature followed by the sighash byte as it appears on the
/// wire, fork-id bit included where the policy requires it.
fn signature_blob(key: &Privkey, digest: Hash256Digest, flag: Sighash, policy: &CoinPolicy) -> Vec<u8> {
    let mut blob = key.sign_digest(digest).serialize_der().to_vec();
    blob.push(flag.wire_byte(policy.fork_id.is_some()));
    blob
}

/// The two-element p2wpkh witness stack: signature blob, then compressed
/// public key.
fn witness_stack(key: &Privkey, digest: Hash256Digest, flag: Sighash, policy: &CoinPolicy) -> Witness {
    vec![
        WitnessStackItem::new(signature_blob(key, digest, flag, policy)),
        WitnessStackItem::new(key.pubkey_compressed().serialize_vec()),
    ]
}

/// If `redeem` is a v0 witness pubkey-hash program, return its hash160 and
/// the program bytes.
fn nested_witness_hash(redeem: &Script) -> Option<([u8; 20], Vec<u8>)> {
    let spk = ScriptPubkey::new(redeem.items().to_vec());
    match spk.standard_type() {
        ScriptType::Wpkh(digest) => Some((digest, redeem.items().to_vec())),
        _ => None,
    }
}

fn sign_nested_witness(
    tx: &mut Transaction,
    index: usize,
    key: &Privkey,
    value: Option<u64>,
    flag: Sighash,
    policy: &CoinPolicy,
    program_hash: [u8; 20],
) -> Result<(), SignError> {
    if tx.input_signed(index) {
        return Ok(());
    }
    if multicoins_core::hashes::hash160(&key.pubkey_compressed().serialize_vec()) != program_hash {
        return Err(SignError::PubkeyNotInRedeem);
    }

    let digest = input_sighash(tx, index, key, &SpendScript::ShWpkh, value, flag, policy)?;
    let redeem = Script::nested_witness_redeem(&key.pubkey_compressed());

    let mut script = vec![];
    push_data(&mut script, redeem.items());
    tx.set_witness(index, witness_stack(key, digest, flag, policy));
    tx.set_script_sig(index, ScriptSig::new(script));
    Ok(())
}

fn sign_multisig(
    tx: &mut Transaction,
    index: usize,
    key: &Privkey,
    redeem: &Script,
    value: Option<u64>,
    flag: Sighash,
    policy: &CoinPolicy,
) -> Result<(), SignError> {
    let (required, redeem_keys) = redeem
        .parse_multisig()
        .ok_or(SignError::UnknownTemplate(index))?;

    // locate the signer's slot in the redeem script's key order
    let compressed = key.pubkey_compressed().serialize_vec();
    let uncompressed = key.pubkey().key.serialize_uncompressed().to_vec();
    let our_slot = redeem_keys
        .iter()
        .position(|k| *k == compressed || *k == uncompressed)
        .ok_or(SignError::PubkeyNotInRedeem)?;

    // recover the slots of any signatures already present
    let existing = parse_pushes(tx.vin[index].script_sig.items());
    let mut slots: Vec<Option<Vec<u8>>> = vec![None; redeem_keys.len()];
    if let Some(pushes) = existing {
        for blob in pushes.iter().filter(|p| !p.is_empty()) {
            if blob.as_slice() == redeem.items() {
                continue;
            }
            if let Some(slot) = slot_for_signature(tx, index, key, redeem, value, policy, &redeem_keys, blob)? {
                slots[slot] = Some(blob.clone());
            }
        }
    }

    let signed_count = slots.iter().filter(|s| s.is_some()).count();
    if slots[our_slot].is_some() || signed_count >= required as usize {
        // fully signed, or our signature is already in place
        return Ok(());
    }

    let spend = SpendScript::Sh(redeem.clone());
    let digest = input_sighash(tx, index, key, &spend, value, flag, policy)?;
    slots[our_slot] = Some(signature_blob(key, digest, flag, policy));

    // CHECKMULTISIG pops one item more than it uses; OP_0 is the dummy
    let mut script = vec![op::OP_0];
    for blob in slots.iter().flatten() {
        push_data(&mut script, blob);
    }
    push_data(&mut script, redeem.items());
    tx.set_script_sig(index, ScriptSig::new(script));
    Ok(())
}

/// Attribute an existing signature blob to its redeem-script slot by
/// verifying it against each key under its own trailing sighash byte.
#[allow(clippy::too_many_arguments)]
fn slot_for_signature(
    tx: &Transaction,
    index: usize,
    key: &Privkey,
    redeem: &Script,
    value: Option<u64>,
    policy: &CoinPolicy,
    redeem_keys: &[Vec<u8>],
    blob: &[u8],
) -> Result<Option<usize>, SignError> {
    let (der, flag_byte) = match blob.split_last() {
        Some((last, rest)) => (rest, *last),
        None => return Ok(None),
    };
    let flag = match Sighash::from_u8(flag_byte) {
        Ok(flag) => flag,
        Err(_) => return Ok(None),
    };
    let sig = match multicoins_bip32::secp256k1::ecdsa::Signature::from_der(der) {
        Ok(sig) => sig,
        Err(_) => return Ok(None),
    };

    let spend = SpendScript::Sh(redeem.clone());
    let digest = input_sighash(tx, index, key, &spend, value, flag, policy)?;
    for (slot, key_bytes) in redeem_keys.iter().enumerate() {
        if let Ok(pubkey) = Pubkey::from_slice(key_bytes) {
            if pubkey.verify_digest(digest, &sig, false).is_ok() {
                return Ok(Some(slot));
            }
        }
    }
    Ok(None)
}

/// Split a script into its pushed items. Returns `None` on any non-push
/// opcode other than `OP_0`.
fn parse_pushes(script: &[u8]) -> Option<Vec<Vec<u8>>> {
    let mut pushes = vec![];
    let mut cursor = 0usize;
    while cursor < script.len() {
        let opcode = script[cursor];
        cursor += 1;
        let push_len = match opcode {
            op::OP_0 => 0,
            1..=0x4b => opcode as usize,
            op::OP_PUSHDATA1 => {
                let len = *script.get(cursor)? as usize;
                cursor += 1;
                len
            }
            op::OP_PUSHDATA2 => {
                let bytes = script.get(cursor..cursor + 2)?;
                cursor += 2;
                u16::from_le_bytes([bytes[0], bytes[1]]) as usize
            }
            _ => return None,
        };
        let data = script.get(cursor..cursor + push_len)?;
        cursor += push_len;
        pushes.push(data.to_vec());
    }
    Some(pushes)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hashes::TXID;
    use crate::nets;
    use crate::types::txin::{Outpoint, TxIn};
    use crate::types::txout::TxOut;
    use multicoins_core::ser::ByteFormat;

    const BRAINWALLET: &str = "89d8d898b95addf569b458fbbd25620e9c9b19c9f730d5d60102abbabcb72678";

    fn test_key(compressed: bool) -> Privkey {
        if compressed {
            Privkey::from_hex(&format!("{}01", BRAINWALLET)).unwrap()
        } else {
            Privkey::from_hex(BRAINWALLET).unwrap()
        }
    }

    fn unsigned_tx(n_inputs: usize) -> Transaction {
        let vin: Vec<TxIn> = (0..n_inputs)
            .map(|i| TxIn::unsigned(Outpoint::new(TXID::from([i as u8; 32]), i as u32)))
            .collect();
        let vout = vec![TxOut::new(
            90_000,
            ScriptPubkey::p2pkh_from_hash([0x11; 20]),
        )];
        Transaction::new(1, vin, vout, 0)
    }

    fn pkh_utxo(tx: &Transaction, index: usize, key: &Privkey) -> Utxo {
        Utxo::new(
            tx.vin[index].outpoint,
            100_000,
            ScriptPubkey::p2pkh(&key.pubkey()),
            SpendScript::Pkh,
        )
    }

    #[test]
    fn it_signs_p2pkh_inputs_and_is_idempotent() {
        let key = test_key(false);
        let mut tx = unsigned_tx(1);
        let utxo = pkh_utxo(&tx, 0, &key);

        sign_utxo(&mut tx, 0, &key, &utxo, Sighash::All, &nets::BITCOIN).unwrap();
        let once = tx.clone();

        // the script sig is <sig_blob> <pubkey>, with the trailing 0x01 byte
        let pushes = parse_pushes(tx.vin[0].script_sig.items()).unwrap();
        assert_eq!(pushes.len(), 2);
        assert_eq!(*pushes[0].last().unwrap(), 0x01);
        assert_eq!(pushes[0][0], 0x30); // DER sequence tag
        assert_eq!(pushes[1], key.pubkey().serialize_vec());
        assert!(tx.witnesses.is_empty());

        // the signature verifies against the sighash it commits to
        let digest = input_sighash(
            &once, 0, &key, &SpendScript::Pkh, None, Sighash::All, &nets::BITCOIN,
        )
        .unwrap();
        let der = &pushes[0][..pushes[0].len() - 1];
        let sig = multicoins_bip32::secp256k1::ecdsa::Signature::from_der(der).unwrap();
        key.pubkey().verify_digest(digest, &sig, true).unwrap();

        // re-signing is a no-op
        sign_utxo(&mut tx, 0, &key, &utxo, Sighash::All, &nets::BITCOIN).unwrap();
        assert_eq!(tx, once);
    }

    #[test]
    fn it_signs_witness_inputs_into_the_witness_stack() {
        let key = test_key(true);
        let mut tx = unsigned_tx(1);
        let utxo = Utxo::new(
            tx.vin[0].outpoint,
            100_000,
            ScriptPubkey::p2wpkh(&key.pubkey()),
            SpendScript::Wpkh,
        );

        sign_utxo(&mut tx, 0, &key, &utxo, Sighash::All, &nets::BITCOIN).unwrap();

        assert!(tx.vin[0].script_sig.is_empty());
        assert_eq!(tx.witnesses[0].len(), 2);
        assert_eq!(
            tx.witnesses[0][1].items(),
            key.pubkey_compressed().serialize_vec().as_slice()
        );
        assert!(tx.has_witness());

        // witness serialization round-trips
        let round_tripped = Transaction::deserialize_hex(&tx.serialize_hex()).unwrap();
        assert_eq!(round_tripped, tx);
    }

    #[test]
    fn it_requires_the_amount_for_witness_and_forkid_signing() {
        let key = test_key(true);
        let mut tx = unsigned_tx(1);

        match sign_input(
            &mut tx, 0, &key, &SpendScript::Wpkh, None, Sighash::All, &nets::BITCOIN,
        ) {
            Err(SignError::MissingPrevoutValue(0)) => {}
            other => panic!("expected MissingPrevoutValue, got {:?}", other),
        }
        match sign_input(
            &mut tx, 0, &key, &SpendScript::Pkh, None, Sighash::All, &nets::BITCOIN_CASH,
        ) {
            Err(SignError::MissingPrevoutValue(0)) => {}
            other => panic!("expected MissingPrevoutValue, got {:?}", other),
        }
        // failure left the transaction untouched
        assert_eq!(tx, unsigned_tx(1));
    }

    #[test]
    fn it_sets_the_fork_id_bit_for_bch() {
        let key = test_key(false);
        let mut tx = unsigned_tx(1);
        let utxo = pkh_utxo(&tx, 0, &key);

        sign_utxo(&mut tx, 0, &key, &utxo, Sighash::All, &nets::BITCOIN_CASH).unwrap();

        let pushes = parse_pushes(tx.vin[0].script_sig.items()).unwrap();
        assert_eq!(*pushes[0].last().unwrap(), 0x41);
        // legacy prevout, but no witness was produced: BCH stays flat
        assert!(!tx.has_witness());
    }

    #[test]
    fn it_signs_nested_witness_inputs() {
        let key = test_key(true);
        let mut tx = unsigned_tx(1);
        let redeem = Script::nested_witness_redeem(&key.pubkey());
        let utxo = Utxo::new(
            tx.vin[0].outpoint,
            100_000,
            ScriptPubkey::p2sh(&redeem),
            SpendScript::ShWpkh,
        );

        sign_utxo(&mut tx, 0, &key, &utxo, Sighash::All, &nets::LITECOIN_TESTNET).unwrap();

        // script sig is exactly one push of the 22-byte redeem
        let pushes = parse_pushes(tx.vin[0].script_sig.items()).unwrap();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0], redeem.items());
        assert_eq!(tx.witnesses[0].len(), 2);
    }

    #[test]
    fn it_orders_multisig_signatures_by_the_redeem_script() {
        let key_a = Privkey::from_hex(&format!("{}01", "11".repeat(32))).unwrap();
        let key_b = Privkey::from_hex(&format!("{}01", "22".repeat(32))).unwrap();
        let redeem = Script::multisig(2, &[key_a.pubkey(), key_b.pubkey()]);

        let make_utxo = |tx: &Transaction| {
            Utxo::new(
                tx.vin[0].outpoint,
                100_000,
                ScriptPubkey::p2sh(&redeem),
                SpendScript::Sh(redeem.clone()),
            )
        };

        // sign a then b
        let mut tx_ab = unsigned_tx(1);
        let utxo = make_utxo(&tx_ab);
        sign_utxo(&mut tx_ab, 0, &key_a, &utxo, Sighash::All, &nets::BITCOIN).unwrap();
        let partial = parse_pushes(tx_ab.vin[0].script_sig.items()).unwrap();
        assert_eq!(partial.len(), 3); // dummy, one sig, redeem
        sign_utxo(&mut tx_ab, 0, &key_b, &utxo, Sighash::All, &nets::BITCOIN).unwrap();

        // sign b then a: identical result, because slots follow the redeem
        let mut tx_ba = unsigned_tx(1);
        sign_utxo(&mut tx_ba, 0, &key_b, &utxo, Sighash::All, &nets::BITCOIN).unwrap();
        sign_utxo(&mut tx_ba, 0, &key_a, &utxo, Sighash::All, &nets::BITCOIN).unwrap();

        assert_eq!(tx_ab, tx_ba);

        let full = parse_pushes(tx_ab.vin[0].script_sig.items()).unwrap();
        assert_eq!(full.len(), 4); // dummy, two sigs, redeem
        assert!(full[0].is_empty()); // the CHECKMULTISIG dummy
        assert_eq!(full[3], redeem.items());

        // a third signature attempt is a no-op
        let done = tx_ab.clone();
        sign_utxo(&mut tx_ab, 0, &key_a, &utxo, Sighash::All, &nets::BITCOIN).unwrap();
        assert_eq!(tx_ab, done);
    }

    #[test]
    fn it_rejects_signers_outside_the_redeem_script() {
        let key_a = Privkey::from_hex(&format!("{}01", "11".repeat(32))).unwrap();
        let stranger = Privkey::from_hex(&format!("{}01", "33".repeat(32))).unwrap();
        let redeem = Script::multisig(1, &[key_a.pubkey()]);

        let mut tx = unsigned_tx(1);
        match sign_input(
            &mut tx,
            0,
            &stranger,
            &SpendScript::Sh(redeem),
            Some(100_000),
            Sighash::All,
            &nets::BITCOIN,
        ) {
            Err(SignError::PubkeyNotInRedeem) => {}
            other => panic!("expected PubkeyNotInRedeem, got {:?}", other),
        }
    }

    #[test]
    fn it_detects_value_underflow_before_signing() {
        let key = test_key(false);
        let mut tx = unsigned_tx(1);
        tx.vout[0].value = 500_000; // more than the 100k utxo carries
        let utxo = pkh_utxo(&tx, 0, &key);

        match sign_all(&mut tx, &key, &[utxo], Sighash::All, &nets::BITCOIN) {
            Err(SignError::ValueUnderflow {
                inputs: 100_000,
                outputs: 500_000,
            }) => {}
            other => panic!("expected ValueUnderflow, got {:?}", other),
        }
        assert!(!tx.input_signed(0));
    }

    #[test]
    fn it_is_deterministic_across_runs() {
        let key = test_key(false);
        let build = || {
            let mut tx = unsigned_tx(2);
            let utxo_0 = pkh_utxo(&tx, 0, &key);
            let utxo_1 = pkh_utxo(&tx, 1, &key);
            sign_all(&mut tx, &key, &[utxo_0, utxo_1], Sighash::All, &nets::BITCOIN).unwrap();
            tx.serialize_hex()
        };
        assert_eq!(build(), build());
    }
}
