//! Marked digests for transaction identifiers.

use multicoins_core::mark_hash256;

mark_hash256!(
    /// A transaction id: the double-SHA-256 of the legacy serialization,
    /// without marker, flag, or witnesses. Stored little-endian as it
    /// appears on the wire; use `to_be_hex` for the display form.
    TXID
);

mark_hash256!(
    /// A witness transaction id: the double-SHA-256 of the BIP141
    /// serialization. Equal to the TXID for transactions without witnesses.
    WTXID
);

#[cfg(test)]
mod test {
    use super::*;
    use multicoins_core::hashes::MarkedDigest;
    use multicoins_core::ser::ByteFormat;

    #[test]
    fn it_reverses_for_display() {
        let txid =
            TXID::deserialize_hex("03ee4f7a4e68f802303bc659f8f817964b4b74fe046facc3ae1be4679d622c45")
                .unwrap();
        assert_eq!(
            txid.to_be_hex(),
            "452c629d67e41baec3ac6f04fe744b4b9617f8f859c63b3002f8684e7a4fee03"
        );
        assert_eq!(TXID::from_be_hex(&txid.to_be_hex()).unwrap(), txid);
        assert_eq!(txid.reversed().reversed(), txid);
    }
}
