//! Per-coin parameters and the uniform façade.
//!
//! Coins differ in data, not behavior: one set of algorithms reads a
//! [`CoinPolicy`] record for address prefixes, extended-key magic, the
//! fork-id sighash quirk, and signed-message prefixes. A [`Coin`] binds a
//! policy to the uniform API.

use thiserror::Error;

use multicoins_bip32::{DerivationError, KeyError, Privkey, Pubkey, XPriv, XPub};
use multicoins_core::enc::EncodingError;
use multicoins_core::hashes::hash160;

use crate::enc::{decode_address, encode_address, Address};
use crate::explorer::{Explorer, PushOutcome, TransportError, UnspentOutput};
use crate::hashes::TXID;
use crate::sign::{sign_all, sign_utxo, SignError};
use crate::types::script::{Script, ScriptPubkey};
use crate::types::tx::{Sighash, Transaction, TxError};
use crate::types::txin::{Outpoint, TxIn};
use crate::types::txout::TxOut;
use crate::types::utxo::{SpendScript, Utxo};

/// The parameters that distinguish one coin (and network) from another.
/// Pure data; immutable after load.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CoinPolicy {
    /// Human-readable coin name.
    pub name: &'static str,
    /// The ticker used to select the coin (`btc`, `bch`, ...).
    pub ticker: &'static str,
    /// True for test networks.
    pub testnet: bool,
    /// The p2pkh address version byte.
    pub p2pkh_version: u8,
    /// The p2sh address version byte.
    pub p2sh_version: u8,
    /// The WIF version byte.
    pub wif_version: u8,
    /// The bech32 human-readable part, for coins with native segwit.
    pub bech32_hrp: Option<&'static str>,
    /// The extended private key Base58Check magic.
    pub xprv_magic: u32,
    /// The extended public key Base58Check magic.
    pub xpub_magic: u32,
    /// The fork id, for chains that sign with `SIGHASH_FORKID` replay
    /// protection. Applies to every input, legacy prevouts included.
    pub fork_id: Option<u32>,
    /// The signed-message prefix (without its length byte).
    pub message_prefix: &'static str,
    /// Whether signature verification rejects high-S signatures.
    pub strict_low_s: bool,
    /// The name used when addressing the explorer transport.
    pub explorer_name: &'static str,
}

/// Bitcoin mainnet.
pub const BITCOIN: CoinPolicy = CoinPolicy {
    name: "Bitcoin",
    ticker: "btc",
    testnet: false,
    p2pkh_version: 0x00,
    p2sh_version: 0x05,
    wif_version: 0x80,
    bech32_hrp: Some("bc"),
    xprv_magic: 0x0488_ade4,
    xpub_magic: 0x0488_b21e,
    fork_id: None,
    message_prefix: "Bitcoin Signed Message:\n",
    strict_low_s: true,
    explorer_name: "btc",
};

/// Bitcoin testnet3.
pub const BITCOIN_TESTNET: CoinPolicy = CoinPolicy {
    name: "Bitcoin Testnet",
    ticker: "btc",
    testnet: true,
    p2pkh_version: 0x6f,
    p2sh_version: 0xc4,
    wif_version: 0xef,
    bech32_hrp: Some("tb"),
    xprv_magic: 0x0435_8394,
    xpub_magic: 0x0435_87cf,
    fork_id: None,
    message_prefix: "Bitcoin Signed Message:\n",
    strict_low_s: true,
    explorer_name: "tbtc",
};

/// Bitcoin Cash mainnet. Base58 prefixes match Bitcoin; replay protection
/// comes from the fork-id sighash instead.
pub const BITCOIN_CASH: CoinPolicy = CoinPolicy {
    name: "Bitcoin Cash",
    ticker: "bch",
    testnet: false,
    p2pkh_version: 0x00,
    p2sh_version: 0x05,
    wif_version: 0x80,
    bech32_hrp: None,
    xprv_magic: 0x0488_ade4,
    xpub_magic: 0x0488_b21e,
    fork_id: Some(0x00_0000),
    message_prefix: "Bitcoin Signed Message:\n",
    strict_low_s: true,
    explorer_name: "bch",
};

/// Bitcoin Cash testnet.
pub const BITCOIN_CASH_TESTNET: CoinPolicy = CoinPolicy {
    name: "Bitcoin Cash Testnet",
    ticker: "bch",
    testnet: true,
    p2pkh_version: 0x6f,
    p2sh_version: 0xc4,
    wif_version: 0xef,
    bech32_hrp: None,
    xprv_magic: 0x0435_8394,
    xpub_magic: 0x0435_87cf,
    fork_id: Some(0x00_0000),
    message_prefix: "Bitcoin Signed Message:\n",
    strict_low_s: true,
    explorer_name: "tbch",
};

/// Litecoin mainnet.
pub const LITECOIN: CoinPolicy = CoinPolicy {
    name: "Litecoin",
    ticker: "ltc",
    testnet: false,
    p2pkh_version: 0x30,
    p2sh_version: 0x32,
    wif_version: 0xb0,
    bech32_hrp: Some("ltc"),
    xprv_magic: 0x0488_ade4,
    xpub_magic: 0x0488_b21e,
    fork_id: None,
    message_prefix: "Litecoin Signed Message:\n",
    strict_low_s: true,
    explorer_name: "ltc",
};

/// Litecoin testnet.
pub const LITECOIN_TESTNET: CoinPolicy = CoinPolicy {
    name: "Litecoin Testnet",
    ticker: "ltc",
    testnet: true,
    p2pkh_version: 0x6f,
    p2sh_version: 0xc4,
    wif_version: 0xef,
    bech32_hrp: Some("tltc"),
    xprv_magic: 0x0435_8394,
    xpub_magic: 0x0435_87cf,
    fork_id: None,
    message_prefix: "Litecoin Signed Message:\n",
    strict_low_s: true,
    explorer_name: "tltc",
};

/// Dash mainnet. No native segwit.
pub const DASH: CoinPolicy = CoinPolicy {
    name: "Dash",
    ticker: "dash",
    testnet: false,
    p2pkh_version: 0x4c,
    p2sh_version: 0x10,
    wif_version: 0xcc,
    bech32_hrp: None,
    xprv_magic: 0x0488_ade4,
    xpub_magic: 0x0488_b21e,
    fork_id: None,
    message_prefix: "DarkCoin Signed Message:\n",
    strict_low_s: false,
    explorer_name: "dash",
};

/// Dash testnet.
pub const DASH_TESTNET: CoinPolicy = CoinPolicy {
    name: "Dash Testnet",
    ticker: "dash",
    testnet: true,
    p2pkh_version: 0x8c,
    p2sh_version: 0x13,
    wif_version: 0xef,
    bech32_hrp: None,
    xprv_magic: 0x0435_8394,
    xpub_magic: 0x0435_87cf,
    fork_id: None,
    message_prefix: "DarkCoin Signed Message:\n",
    strict_low_s: false,
    explorer_name: "tdash",
};

/// Dogecoin mainnet. No native segwit. Parameters per the Dogecoin Core
/// chainparams.
pub const DOGECOIN: CoinPolicy = CoinPolicy {
    name: "Dogecoin",
    ticker: "doge",
    testnet: false,
    p2pkh_version: 0x1e,
    p2sh_version: 0x16,
    wif_version: 0x9e,
    bech32_hrp: None,
    xprv_magic: 0x02fa_c398,
    xpub_magic: 0x02fa_cafd,
    fork_id: None,
    message_prefix: "Dogecoin Signed Message:\n",
    strict_low_s: false,
    explorer_name: "doge",
};

/// Dogecoin testnet, per the Dogecoin Core chainparams.
pub const DOGECOIN_TESTNET: CoinPolicy = CoinPolicy {
    name: "Dogecoin Testnet",
    ticker: "doge",
    testnet: true,
    p2pkh_version: 0x71,
    p2sh_version: 0xc4,
    wif_version: 0xf1,
    bech32_hrp: None,
    xprv_magic: 0x0432_a243,
    xpub_magic: 0x0432_a9a8,
    fork_id: None,
    message_prefix: "Dogecoin Signed Message:\n",
    strict_low_s: false,
    explorer_name: "tdoge",
};

/// Every policy this build knows.
pub const REGISTRY: &[&CoinPolicy] = &[
    &BITCOIN,
    &BITCOIN_TESTNET,
    &BITCOIN_CASH,
    &BITCOIN_CASH_TESTNET,
    &LITECOIN,
    &LITECOIN_TESTNET,
    &DASH,
    &DASH_TESTNET,
    &DOGECOIN,
    &DOGECOIN_TESTNET,
];

/// Look a policy up by ticker and network.
pub fn lookup(ticker: &str, testnet: bool) -> Option<&'static CoinPolicy> {
    REGISTRY
        .iter()
        .find(|p| p.ticker == ticker && p.testnet == testnet)
        .copied()
}

/// Errors surfaced by the façade. Categories are kept distinct: encoding,
/// key, derivation, signing, codec, and transport failures never conflate.
#[derive(Debug, Error)]
pub enum CoinError {
    /// Key parsing or use failed.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Address or base encoding failed.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Deterministic derivation failed.
    #[error(transparent)]
    Derivation(#[from] DerivationError),

    /// Signing failed; the transaction is unchanged.
    #[error(transparent)]
    Sign(#[from] SignError),

    /// Transaction encoding or decoding failed.
    #[error(transparent)]
    Tx(#[from] TxError),

    /// The explorer transport failed; the body is verbatim.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Coin selection could not cover the payment plus fee.
    #[error("insufficient funds: have {available} sat, need {needed} sat")]
    InsufficientFunds {
        /// Total value of the spendable outputs.
        available: u64,
        /// Payment value plus fee.
        needed: u64,
    },
}

/// A coin bound to its policy: the uniform API over keys, addresses,
/// transactions, and the explorer transport.
#[derive(Clone, Copy, Debug)]
pub struct Coin {
    policy: &'static CoinPolicy,
}

impl Coin {
    /// Bind a policy.
    pub const fn new(policy: &'static CoinPolicy) -> Self {
        Self { policy }
    }

    /// Bitcoin mainnet.
    pub const fn bitcoin() -> Self {
        Self::new(&BITCOIN)
    }

    /// Bitcoin testnet.
    pub const fn bitcoin_testnet() -> Self {
        Self::new(&BITCOIN_TESTNET)
    }

    /// Bitcoin Cash mainnet.
    pub const fn bitcoin_cash() -> Self {
        Self::new(&BITCOIN_CASH)
    }

    /// Litecoin mainnet.
    pub const fn litecoin() -> Self {
        Self::new(&LITECOIN)
    }

    /// Litecoin testnet.
    pub const fn litecoin_testnet() -> Self {
        Self::new(&LITECOIN_TESTNET)
    }

    /// Dash mainnet.
    pub const fn dash() -> Self {
        Self::new(&DASH)
    }

    /// Dogecoin mainnet.
    pub const fn dogecoin() -> Self {
        Self::new(&DOGECOIN)
    }

    /// Look a coin up by ticker and network.
    pub fn lookup(ticker: &str, testnet: bool) -> Option<Self> {
        lookup(ticker, testnet).map(Self::new)
    }

    /// The bound policy.
    pub fn policy(&self) -> &'static CoinPolicy {
        self.policy
    }

    /// Parse a private key from hex or WIF under this coin's prefix.
    pub fn parse_key(&self, key: &str) -> Result<Privkey, CoinError> {
        Ok(Privkey::parse(key, self.policy.wif_version)?)
    }

    /// Export a private key as WIF under this coin's prefix.
    pub fn wif(&self, key: &Privkey) -> String {
        key.to_wif(self.policy.wif_version)
    }

    /// Derive the public key of a private key, hex-encoded, honoring the
    /// key's compression hint.
    pub fn privtopub(&self, key: &str) -> Result<String, CoinError> {
        Ok(self.parse_key(key)?.pubkey().serialize_hex())
    }

    /// The p2pkh address of a public key.
    pub fn pubtoaddr(&self, pubkey: &Pubkey) -> String {
        encode_address(&Address::Pkh(pubkey.hash160()), self.policy)
            .expect("p2pkh needs no HRP")
    }

    /// The p2pkh address of a private key.
    pub fn privtoaddr(&self, key: &str) -> Result<String, CoinError> {
        Ok(self.pubtoaddr(&self.parse_key(key)?.pubkey()))
    }

    /// The p2wpkh-in-p2sh address of a public key. The witness program
    /// commits to the compressed key.
    pub fn pubtop2w(&self, pubkey: &Pubkey) -> String {
        let redeem = Script::nested_witness_redeem(pubkey);
        encode_address(&Address::Sh(hash160(redeem.items())), self.policy)
            .expect("p2sh needs no HRP")
    }

    /// The p2wpkh-in-p2sh address of a private key.
    pub fn privtop2w(&self, key: &str) -> Result<String, CoinError> {
        Ok(self.pubtop2w(&self.parse_key(key)?.pubkey_compressed()))
    }

    /// The native segwit (bech32) address of a public key, for coins that
    /// define an HRP.
    pub fn pubtosegwit(&self, pubkey: &Pubkey) -> Result<String, CoinError> {
        let program = hash160(&pubkey.key.serialize());
        Ok(encode_address(&Address::Wpkh(program), self.policy)?)
    }

    /// True if the string parses as any address of this coin.
    pub fn is_address(&self, addr: &str) -> bool {
        decode_address(addr, self.policy).is_ok()
    }

    /// True if the string parses as a p2sh address of this coin.
    pub fn is_p2sh(&self, addr: &str) -> bool {
        matches!(decode_address(addr, self.policy), Ok(Address::Sh(_)))
    }

    /// True if the string parses as a native segwit address of this coin.
    pub fn is_segwit(&self, addr: &str) -> bool {
        matches!(decode_address(addr, self.policy), Ok(Address::Wpkh(_)))
    }

    /// An output paying `value` satoshis to `address`.
    pub fn output_to(&self, address: &str, value: u64) -> Result<TxOut, CoinError> {
        let decoded = decode_address(address, self.policy)?;
        Ok(TxOut::new(value, decoded.script_pubkey()))
    }

    /// Construct an unsigned transaction spending the given UTXOs to the
    /// given outputs.
    pub fn mktx(&self, utxos: &[Utxo], outputs: Vec<TxOut>) -> Transaction {
        let vin: Vec<TxIn> = utxos
            .iter()
            .map(|utxo| TxIn::unsigned(utxo.outpoint))
            .collect();
        Transaction::new(1, vin, outputs, 0)
    }

    /// Sign one input against its UTXO with `SIGHASH_ALL` (plus the fork-id
    /// bit where this coin requires it). Re-signing is a no-op.
    pub fn sign(
        &self,
        tx: &mut Transaction,
        index: usize,
        key: &str,
        utxo: &Utxo,
    ) -> Result<(), CoinError> {
        let key = self.parse_key(key)?;
        sign_utxo(tx, index, &key, utxo, Sighash::All, self.policy)?;
        Ok(())
    }

    /// Sign every input against its UTXO.
    pub fn sign_all(
        &self,
        tx: &mut Transaction,
        key: &str,
        utxos: &[Utxo],
    ) -> Result<(), CoinError> {
        let key = self.parse_key(key)?;
        sign_all(tx, &key, utxos, Sighash::All, self.policy)?;
        Ok(())
    }

    /// The BIP32 master key for a seed.
    pub fn master_key(&self, seed: &[u8]) -> Result<XPriv, CoinError> {
        Ok(XPriv::master_from_seed(seed)?)
    }

    /// Serialize an extended private key under this coin's magic.
    pub fn encode_xprv(&self, xpriv: &XPriv) -> String {
        xpriv.serialize_base58(self.policy.xprv_magic)
    }

    /// Serialize an extended public key under this coin's magic.
    pub fn encode_xpub(&self, xpub: &XPub) -> String {
        xpub.serialize_base58(self.policy.xpub_magic)
    }

    /// Parse an extended private key under this coin's magic.
    pub fn decode_xprv(&self, s: &str) -> Result<XPriv, CoinError> {
        Ok(XPriv::parse_base58(s, self.policy.xprv_magic)?)
    }

    /// Parse an extended public key under this coin's magic.
    pub fn decode_xpub(&self, s: &str) -> Result<XPub, CoinError> {
        Ok(XPub::parse_base58(s, self.policy.xpub_magic)?)
    }

    /// Fetch and convert the unspent outputs of an address. The spend kind
    /// is inferred from the address form: base58 p2sh addresses are assumed
    /// to nest a witness program, which is the only p2sh output this façade
    /// creates for a single key.
    pub fn unspent(
        &self,
        explorer: &dyn Explorer,
        address: &str,
    ) -> Result<Vec<Utxo>, CoinError> {
        let decoded = decode_address(address, self.policy)?;
        let spend = match decoded {
            Address::Pkh(_) => SpendScript::Pkh,
            Address::Sh(_) => SpendScript::ShWpkh,
            Address::Wpkh(_) => SpendScript::Wpkh,
        };
        let script_pubkey = decoded.script_pubkey();

        let mut utxos = vec![];
        for unspent in explorer.unspent(address)? {
            utxos.push(self.to_utxo(&unspent, &script_pubkey, &spend)?);
        }
        Ok(utxos)
    }

    fn to_utxo(
        &self,
        unspent: &UnspentOutput,
        script_pubkey: &ScriptPubkey,
        spend: &SpendScript,
    ) -> Result<Utxo, CoinError> {
        let txid = TXID::from_be_hex(&unspent.txid)
            .map_err(|e| TransportError::BadResponse(e.to_string()))?;
        Ok(Utxo::new(
            Outpoint::new(txid, unspent.vout),
            unspent.value,
            script_pubkey.clone(),
            spend.clone(),
        ))
    }

    /// The transaction history of an address.
    pub fn history(
        &self,
        explorer: &dyn Explorer,
        address: &str,
    ) -> Result<Vec<crate::explorer::HistoryEntry>, CoinError> {
        Ok(explorer.history(address)?)
    }

    /// Fetch a raw transaction by display-order txid.
    pub fn fetchtx(&self, explorer: &dyn Explorer, txid: &str) -> Result<String, CoinError> {
        Ok(explorer.fetchtx(txid)?)
    }

    /// Broadcast a transaction.
    pub fn pushtx(
        &self,
        explorer: &dyn Explorer,
        tx: &Transaction,
    ) -> Result<PushOutcome, CoinError> {
        use multicoins_core::ser::ByteFormat;
        Ok(explorer.pushtx(&tx.serialize_hex())?)
    }

    /// Gather UTXOs for the key's p2pkh address, build a payment with
    /// change back to the source, sign every input, and broadcast.
    pub fn send(
        &self,
        explorer: &dyn Explorer,
        key: &str,
        to_address: &str,
        value: u64,
        fee: u64,
    ) -> Result<PushOutcome, CoinError> {
        let parsed = self.parse_key(key)?;
        let from_address = self.pubtoaddr(&parsed.pubkey());

        // largest-first selection
        let mut candidates = self.unspent(explorer, &from_address)?;
        candidates.sort_by(|a, b| b.value.cmp(&a.value));

        let needed = value + fee;
        let mut selected = vec![];
        let mut gathered = 0u64;
        for utxo in candidates {
            gathered += utxo.value;
            selected.push(utxo);
            if gathered >= needed {
                break;
            }
        }
        if gathered < needed {
            return Err(CoinError::InsufficientFunds {
                available: gathered,
                needed,
            });
        }

        let mut outputs = vec![self.output_to(to_address, value)?];
        let change = gathered - needed;
        if change > 0 {
            outputs.push(self.output_to(&from_address, change)?);
        }

        let mut tx = self.mktx(&selected, outputs);
        sign_all(&mut tx, &parsed, &selected, Sighash::All, self.policy)?;
        self.pushtx(explorer, &tx)
    }
}
