//! Bech32 segwit addresses (BIP173). Only witness version 0 programs are
//! supported; the human-readable part comes from the coin's policy.

use bech32::{FromBase32, ToBase32, Variant};

use crate::enc::{EncodingError, EncodingResult};

/// Encode a segwit v0 witness program under the given HRP.
pub fn encode_segwit(hrp: &str, program: &[u8]) -> EncodingResult<String> {
    if program.len() != 20 && program.len() != 32 {
        return Err(EncodingError::BadProgramLength(program.len()));
    }
    let mut data = vec![::bech32::u5::try_from_u8(0).expect("0 is a valid u5")];
    data.extend(program.to_base32());
    Ok(::bech32::encode(hrp, data, Variant::Bech32)?)
}

/// Decode a segwit address, checking the HRP against the one the coin
/// expects. Returns the witness program.
pub fn decode_segwit(expected_hrp: &str, addr: &str) -> EncodingResult<Vec<u8>> {
    let (hrp, data, variant) = ::bech32::decode(addr)?;
    if hrp != expected_hrp {
        return Err(EncodingError::WrongHrp {
            expected: expected_hrp.to_owned(),
            got: hrp,
        });
    }
    if variant != Variant::Bech32 || data.is_empty() {
        return Err(EncodingError::Bech32(::bech32::Error::InvalidChecksum));
    }
    let version = data[0].to_u8();
    if version != 0 {
        return Err(EncodingError::UnsupportedWitnessVersion(version));
    }
    let program = Vec::<u8>::from_base32(&data[1..])?;
    if program.len() != 20 && program.len() != 32 {
        return Err(EncodingError::BadProgramLength(program.len()));
    }
    Ok(program)
}

#[cfg(test)]
mod test {
    use super::*;

    // hash160 of the compressed generator point; the BIP173 example program
    const PROGRAM: &str = "751e76e8199196d454941c45d1b3a323f1433bd6";

    #[test]
    fn it_encodes_the_bip173_example() {
        let program = hex::decode(PROGRAM).unwrap();
        assert_eq!(
            encode_segwit("bc", &program).unwrap(),
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"
        );
        assert_eq!(
            encode_segwit("tb", &program).unwrap(),
            "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx"
        );
    }

    #[test]
    fn it_round_trips_and_rejects_bit_flips() {
        let program = hex::decode(PROGRAM).unwrap();
        let addr = encode_segwit("ltc", &program).unwrap();
        assert_eq!(decode_segwit("ltc", &addr).unwrap(), program);

        // flip one character in the data part
        let mut corrupted: Vec<char> = addr.chars().collect();
        let last = corrupted.len() - 1;
        corrupted[last] = if corrupted[last] == 'q' { 'p' } else { 'q' };
        let corrupted: String = corrupted.into_iter().collect();
        assert!(decode_segwit("ltc", &corrupted).is_err());
    }

    #[test]
    fn it_rejects_wrong_hrp_and_nonzero_versions() {
        let program = hex::decode(PROGRAM).unwrap();
        let addr = encode_segwit("bc", &program).unwrap();
        match decode_segwit("tb", &addr) {
            Err(EncodingError::WrongHrp { .. }) => {}
            other => panic!("expected WrongHrp, got {:?}", other),
        }

        // a v1 (taproot-style) program is not supported
        let mut data = vec![::bech32::u5::try_from_u8(1).unwrap()];
        data.extend(program.to_base32());
        let v1 = bech32::encode("bc", data, Variant::Bech32).unwrap();
        match decode_segwit("bc", &v1) {
            Err(EncodingError::UnsupportedWitnessVersion(1)) => {}
            other => panic!("expected UnsupportedWitnessVersion, got {:?}", other),
        }
    }
}
