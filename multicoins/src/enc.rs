//! Address encoding, decoding, and classification, parameterized by the
//! coin's policy record rather than by per-network types.

use multicoins_core::enc::{base58, bech32, EncodingError, EncodingResult};
use multicoins_core::hashes::Hash160Digest;

use crate::nets::CoinPolicy;
use crate::types::script::{ScriptPubkey, ScriptType};

/// A decoded address: the standard output template it locks to, plus the
/// 20-byte payload. Addresses round-trip through decode and encode
/// byte-for-byte.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Address {
    /// A pay-to-pubkey-hash address.
    Pkh(Hash160Digest),
    /// A pay-to-script-hash address.
    Sh(Hash160Digest),
    /// A v0 witness pubkey-hash address.
    Wpkh(Hash160Digest),
}

impl Address {
    /// The locking script this address describes.
    pub fn script_pubkey(&self) -> ScriptPubkey {
        match self {
            Address::Pkh(digest) => ScriptPubkey::p2pkh_from_hash(*digest),
            Address::Sh(digest) => ScriptPubkey::p2sh_from_hash(*digest),
            Address::Wpkh(digest) => ScriptPubkey::p2wpkh_from_hash(*digest),
        }
    }

    /// Classify a locking script into an address, if it matches a standard
    /// template.
    pub fn from_script_pubkey(script_pubkey: &ScriptPubkey) -> Option<Self> {
        match script_pubkey.standard_type() {
            ScriptType::Pkh(digest) => Some(Address::Pkh(digest)),
            ScriptType::Sh(digest) => Some(Address::Sh(digest)),
            ScriptType::Wpkh(digest) => Some(Address::Wpkh(digest)),
            ScriptType::NonStandard => None,
        }
    }
}

/// Render an address as a string under the coin's policy. Witness addresses
/// require the policy to define a bech32 HRP.
pub fn encode_address(address: &Address, policy: &CoinPolicy) -> EncodingResult<String> {
    match address {
        Address::Pkh(digest) => {
            let mut payload = vec![policy.p2pkh_version];
            payload.extend_from_slice(digest);
            Ok(base58::encode_check(&payload))
        }
        Address::Sh(digest) => {
            let mut payload = vec![policy.p2sh_version];
            payload.extend_from_slice(digest);
            Ok(base58::encode_check(&payload))
        }
        Address::Wpkh(digest) => {
            let hrp = policy.bech32_hrp.ok_or(EncodingError::NoSegwitHrp)?;
            bech32::encode_segwit(hrp, digest)
        }
    }
}

/// Parse an address string under the coin's policy. Checksum failures and
/// foreign version bytes are distinct errors.
pub fn decode_address(s: &str, policy: &CoinPolicy) -> EncodingResult<Address> {
    if let Some(hrp) = policy.bech32_hrp {
        let looks_bech32 = s
            .to_lowercase()
            .starts_with(&format!("{}1", hrp));
        if looks_bech32 {
            let program = bech32::decode_segwit(hrp, s)?;
            if program.len() != 20 {
                return Err(EncodingError::BadProgramLength(program.len()));
            }
            let mut digest = Hash160Digest::default();
            digest.copy_from_slice(&program);
            return Ok(Address::Wpkh(digest));
        }
    }

    let payload = base58::decode_check(s)?;
    if payload.len() != 21 {
        return Err(EncodingError::BadPayloadLength(payload.len()));
    }
    let mut digest = Hash160Digest::default();
    digest.copy_from_slice(&payload[1..]);

    if payload[0] == policy.p2pkh_version {
        Ok(Address::Pkh(digest))
    } else if payload[0] == policy.p2sh_version {
        Ok(Address::Sh(digest))
    } else {
        Err(EncodingError::UnknownVersionByte(payload[0]))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::nets;

    #[test]
    fn it_round_trips_addresses_byte_for_byte() {
        let digest: Hash160Digest = [0x42; 20];
        let cases = [
            Address::Pkh(digest),
            Address::Sh(digest),
            Address::Wpkh(digest),
        ];
        for address in cases.iter() {
            for policy in [&nets::BITCOIN, &nets::BITCOIN_TESTNET, &nets::LITECOIN] {
                let encoded = encode_address(address, policy).unwrap();
                assert_eq!(decode_address(&encoded, policy).unwrap(), *address);
            }
        }
    }

    #[test]
    fn it_refuses_witness_addresses_without_an_hrp() {
        let address = Address::Wpkh([0x42; 20]);
        match encode_address(&address, &nets::DOGECOIN) {
            Err(EncodingError::NoSegwitHrp) => {}
            other => panic!("expected NoSegwitHrp, got {:?}", other),
        }
    }

    #[test]
    fn it_rejects_foreign_version_bytes() {
        let address = Address::Pkh([0x42; 20]);
        let litecoin = encode_address(&address, &nets::LITECOIN).unwrap();
        match decode_address(&litecoin, &nets::BITCOIN) {
            Err(EncodingError::UnknownVersionByte(0x30)) => {}
            other => panic!("expected UnknownVersionByte, got {:?}", other),
        }
    }

    #[test]
    fn it_maps_addresses_to_scripts_and_back() {
        let address = Address::Pkh([0x42; 20]);
        let script = address.script_pubkey();
        assert_eq!(Address::from_script_pubkey(&script), Some(address));

        let nonstandard = ScriptPubkey::new(vec![0xde, 0xad]);
        assert_eq!(Address::from_script_pubkey(&nonstandard), None);
    }
}
