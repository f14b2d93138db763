//! A thin argument-parsing shell over the multicoins library: one method
//! name, positional arguments, and flags selecting the coin and how stdin
//! is fed in. Exits 0 on success, non-zero on parse or transport failure.

use std::io::Read;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;

use multicoins::prelude::*;
use multicoins_bip32::Pubkey;
use multicoins_provider::EsploraProvider;

#[derive(Parser)]
#[command(name = "multicoins", version, about = "multi-coin UTXO toolkit")]
struct Args {
    /// Coin ticker: btc, bch, ltc, dash, or doge.
    #[arg(long, default_value = "btc")]
    coin: String,

    /// Use the coin's test network.
    #[arg(long)]
    testnet: bool,

    /// Explorer base URL, overriding the hosted default.
    #[arg(long)]
    explorer_url: Option<String>,

    /// Read stdin and append it as the last argument.
    #[arg(short = 's')]
    stdin_arg: bool,

    /// Parse stdin as a JSON array and splat it into the arguments.
    #[arg(short = 'j')]
    stdin_json: bool,

    /// Read stdin as raw bytes and append the hex as the last argument.
    #[arg(short = 'b')]
    stdin_bytes: bool,

    /// The method to invoke.
    method: String,

    /// Positional arguments for the method.
    args: Vec<String>,
}

fn gather_args(args: &Args) -> Result<Vec<String>> {
    let mut out = args.args.clone();
    if args.stdin_arg || args.stdin_json || args.stdin_bytes {
        let mut buf = vec![];
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("reading stdin")?;
        if args.stdin_bytes {
            out.push(hex::encode(buf));
        } else if args.stdin_json {
            let parsed: serde_json::Value =
                serde_json::from_slice(&buf).context("parsing stdin as JSON")?;
            match parsed {
                serde_json::Value::Array(items) => {
                    for item in items {
                        match item {
                            serde_json::Value::String(s) => out.push(s),
                            other => out.push(other.to_string()),
                        }
                    }
                }
                other => out.push(other.to_string()),
            }
        } else {
            out.push(String::from_utf8_lossy(&buf).trim().to_owned());
        }
    }
    Ok(out)
}

fn explorer(args: &Args, coin: &Coin) -> Result<EsploraProvider> {
    if let Some(url) = &args.explorer_url {
        return Ok(EsploraProvider::new(url.clone()));
    }
    EsploraProvider::for_policy(coin.policy())
        .ok_or_else(|| anyhow!("no hosted explorer for {}; pass --explorer-url", coin.policy().name))
}

fn want(args: &[String], count: usize, usage: &str) -> Result<()> {
    if args.len() < count {
        bail!("usage: {}", usage);
    }
    Ok(())
}

fn run(args: Args) -> Result<String> {
    let coin = Coin::lookup(&args.coin, args.testnet)
        .ok_or_else(|| anyhow!("unknown coin: {}", args.coin))?;
    let a = gather_args(&args)?;

    match args.method.as_str() {
        "privtopub" => {
            want(&a, 1, "privtopub <priv>")?;
            Ok(coin.privtopub(&a[0])?)
        }
        "privtoaddr" => {
            want(&a, 1, "privtoaddr <priv>")?;
            Ok(coin.privtoaddr(&a[0])?)
        }
        "privtop2w" => {
            want(&a, 1, "privtop2w <priv>")?;
            Ok(coin.privtop2w(&a[0])?)
        }
        "pubtoaddr" => {
            want(&a, 1, "pubtoaddr <pub_hex>")?;
            let pubkey = Pubkey::from_slice(&hex::decode(&a[0])?)?;
            Ok(coin.pubtoaddr(&pubkey))
        }
        "wif" => {
            want(&a, 1, "wif <priv>")?;
            Ok(coin.wif(&coin.parse_key(&a[0])?))
        }
        "is_address" | "is_p2sh" | "is_segwit" => {
            want(&a, 1, "is_address <addr>")?;
            let verdict = match args.method.as_str() {
                "is_address" => coin.is_address(&a[0]),
                "is_p2sh" => coin.is_p2sh(&a[0]),
                _ => coin.is_segwit(&a[0]),
            };
            Ok(verdict.to_string())
        }
        "txid" => {
            want(&a, 1, "txid <rawtx_hex>")?;
            let tx = Transaction::deserialize_hex(&a[0])?;
            Ok(tx.txid().to_be_hex())
        }
        "sign_message" => {
            want(&a, 2, "sign_message <priv> <message>")?;
            let key = coin.parse_key(&a[0])?;
            Ok(multicoins::messages::sign_message(
                &key,
                coin.policy(),
                a[1].as_bytes(),
            ))
        }
        "verify_message" => {
            want(&a, 3, "verify_message <addr> <message> <sig_b64>")?;
            Ok(multicoins::messages::verify_message(
                coin.policy(),
                &a[0],
                a[1].as_bytes(),
                &a[2],
            )?
            .to_string())
        }
        "unspent" => {
            want(&a, 1, "unspent <addr>")?;
            let utxos = coin.unspent(&explorer(&args, &coin)?, &a[0])?;
            let rows: Vec<String> = utxos
                .iter()
                .map(|u| {
                    format!(
                        "{}:{} {}",
                        u.outpoint.txid.to_be_hex(),
                        u.outpoint.idx,
                        u.value
                    )
                })
                .collect();
            Ok(rows.join("\n"))
        }
        "history" => {
            want(&a, 1, "history <addr>")?;
            let entries = coin.history(&explorer(&args, &coin)?, &a[0])?;
            let rows: Vec<String> = entries
                .iter()
                .map(|e| format!("{} {:?}", e.txid, e.height))
                .collect();
            Ok(rows.join("\n"))
        }
        "fetchtx" => {
            want(&a, 1, "fetchtx <txid>")?;
            Ok(coin.fetchtx(&explorer(&args, &coin)?, &a[0])?)
        }
        "pushtx" => {
            want(&a, 1, "pushtx <rawtx_hex>")?;
            let tx = Transaction::deserialize_hex(&a[0])?;
            let outcome = coin.pushtx(&explorer(&args, &coin)?, &tx)?;
            Ok(format!("{} {}", outcome.status, outcome.txid.unwrap_or_default()))
        }
        "send" => {
            want(&a, 4, "send <priv> <to_addr> <value_sat> <fee_sat>")?;
            let value: u64 = a[2].parse().context("value must be satoshis")?;
            let fee: u64 = a[3].parse().context("fee must be satoshis")?;
            let outcome = coin.send(&explorer(&args, &coin)?, &a[0], &a[1], value, fee)?;
            Ok(format!("{} {}", outcome.status, outcome.txid.unwrap_or_default()))
        }
        other => bail!("unknown method: {}", other),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}
