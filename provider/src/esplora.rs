//! An Esplora (Blockstream-style REST) explorer adapter.

use serde::Deserialize;
use tracing::debug;

use multicoins::explorer::{
    Explorer, HistoryEntry, PushOutcome, TransportError, UnspentOutput,
};
use multicoins::nets::CoinPolicy;

/// The Blockstream-hosted endpoints, for the networks it serves.
fn default_url(policy: &CoinPolicy) -> Option<&'static str> {
    match policy.explorer_name {
        "btc" => Some("https://blockstream.info/api"),
        "tbtc" => Some("https://blockstream.info/testnet/api"),
        _ => None,
    }
}

/// A blocking Esplora client. One instance per coin; the base URL carries
/// the network.
pub struct EsploraProvider {
    base_url: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct EsploraUtxo {
    txid: String,
    vout: u32,
    value: u64,
}

#[derive(Debug, Deserialize)]
struct EsploraTxStatus {
    #[serde(default)]
    block_height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EsploraTx {
    txid: String,
    status: EsploraTxStatus,
}

impl EsploraProvider {
    /// Instantiate against an explicit base URL, e.g.
    /// `https://blockstream.info/api`.
    pub fn new<T: Into<String>>(base_url: T) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Instantiate against the hosted endpoint for a policy, where one
    /// exists.
    pub fn for_policy(policy: &CoinPolicy) -> Option<Self> {
        default_url(policy).map(Self::new)
    }

    fn get(&self, path: &str) -> Result<String, TransportError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, "esplora GET");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| TransportError::BadResponse(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(TransportError::BadStatus { status, body });
        }
        Ok(body)
    }
}

impl Explorer for EsploraProvider {
    fn unspent(&self, address: &str) -> Result<Vec<UnspentOutput>, TransportError> {
        let body = self.get(&format!("address/{}/utxo", address))?;
        let utxos: Vec<EsploraUtxo> =
            serde_json::from_str(&body).map_err(|e| TransportError::BadResponse(e.to_string()))?;
        Ok(utxos
            .into_iter()
            .map(|u| UnspentOutput {
                txid: u.txid,
                vout: u.vout,
                value: u.value,
                segwit: None,
            })
            .collect())
    }

    fn fetchtx(&self, txid: &str) -> Result<String, TransportError> {
        self.get(&format!("tx/{}/hex", txid))
    }

    fn history(&self, address: &str) -> Result<Vec<HistoryEntry>, TransportError> {
        let body = self.get(&format!("address/{}/txs", address))?;
        let txs: Vec<EsploraTx> =
            serde_json::from_str(&body).map_err(|e| TransportError::BadResponse(e.to_string()))?;
        Ok(txs
            .into_iter()
            .map(|t| HistoryEntry {
                txid: t.txid,
                height: t.status.block_height,
            })
            .collect())
    }

    fn pushtx(&self, rawtx_hex: &str) -> Result<PushOutcome, TransportError> {
        let url = format!("{}/tx", self.base_url);
        debug!(url = %url, "esplora POST");
        let response = self
            .client
            .post(&url)
            .body(rawtx_hex.to_owned())
            .send()
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| TransportError::BadResponse(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(TransportError::BadStatus { status, body });
        }
        Ok(PushOutcome {
            status: "success".to_owned(),
            txid: Some(body.trim().to_owned()),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_parses_esplora_response_shapes() {
        let utxos: Vec<EsploraUtxo> = serde_json::from_str(
            r#"[{"txid":"452c629d67e41baec3ac6f04fe744b4b9617f8f859c63b3002f8684e7a4fee03",
                 "vout":1,"value":180000000,
                 "status":{"confirmed":true,"block_height":2}}]"#,
        )
        .unwrap();
        assert_eq!(utxos[0].vout, 1);
        assert_eq!(utxos[0].value, 180_000_000);

        let txs: Vec<EsploraTx> = serde_json::from_str(
            r#"[{"txid":"9e77087321b870859ebf08976d665c42d9f98cad18fff6a05a91c1d2da6d6c41",
                 "status":{"confirmed":false}}]"#,
        )
        .unwrap();
        assert_eq!(txs[0].status.block_height, None);
    }

    #[test]
    fn it_knows_the_hosted_endpoints() {
        assert!(EsploraProvider::for_policy(&multicoins::nets::BITCOIN).is_some());
        assert!(EsploraProvider::for_policy(&multicoins::nets::DOGECOIN).is_none());
    }
}
