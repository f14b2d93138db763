//! Holds the consensus types: scripts, witnesses, inputs, outputs, UTXOs,
//! and transactions.

pub mod script;
pub mod tx;
pub mod txin;
pub mod txout;
pub mod utxo;

pub use script::*;
pub use tx::*;
pub use txin::*;
pub use txout::*;
pub use utxo::*;
