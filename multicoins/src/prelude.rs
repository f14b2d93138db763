//! Common re-exports.

pub use crate::builder::TxBuilder;
pub use crate::enc::{decode_address, encode_address, Address};
pub use crate::explorer::{Explorer, HistoryEntry, PushOutcome, TransportError, UnspentOutput};
pub use crate::hashes::{TXID, WTXID};
pub use crate::nets::{lookup, Coin, CoinError, CoinPolicy, REGISTRY};
pub use crate::sign::{input_sighash, sign_all, sign_input, sign_utxo, SignError};
pub use crate::types::script::{Script, ScriptPubkey, ScriptSig, Witness, WitnessStackItem};
pub use crate::types::tx::{Sighash, Transaction, TxError, SIGHASH_FORKID};
pub use crate::types::txin::{Outpoint, TxIn, Vin};
pub use crate::types::txout::{TxOut, Vout};
pub use crate::types::utxo::{SpendScript, Utxo};

pub use multicoins_bip32::{
    DerivationPath, Hint, KeyError, Privkey, Pubkey, XPriv, XPub, BIP32_HARDEN,
};
pub use multicoins_core::ser::ByteFormat;
