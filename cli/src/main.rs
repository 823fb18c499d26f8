//! txkit - inspect, construct, sign, and validate Bitcoin transactions.
//!
//! Positional arguments may be any mixture of transactions (hex on the
//! command line, a file of binary or hex, or a txid resolved through
//! the cache/explorer source), `txid/index/script_hex/value` spendable
//! descriptors, WIF private keys, and destinations (addresses or raw
//! script hex, optionally `addr/amount` in satoshis).
//!
//! With spendables and destinations a new transaction is assembled; a
//! destination without an amount receives the residual after explicit
//! outputs and the fee. Keys sign whatever inputs they can. The result
//! is summarized to stdout or written with `-o`.

mod inputs;
mod source;
mod summary;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;

use txkit_script::Network;
use txkit_transaction::sighash::SIGHASH_ALL;
use txkit_transaction::solver::{sign_transaction, KeyRing};
use txkit_transaction::verify::{verify_all_inputs, InputStatus};
use txkit_transaction::Transaction;

use inputs::{attach_spendables, augment_spendables, build_spend, ParsedItems};
use source::ChainedSource;
use summary::render_summary;

/// Inspect, construct, sign, and validate Bitcoin transactions.
#[derive(Parser, Debug)]
#[command(name = "txkit", version, about, long_about = None)]
struct Args {
    /// Transactions (hex, file path, or txid), spendable descriptors,
    /// WIF private keys, and destination addresses
    #[arg(required = true)]
    items: Vec<String>,

    /// Write the resulting transaction to this path (hex unless the
    /// extension suggests binary: .bin or .tx)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Augment: resolve missing spendables through the transaction
    /// source and verify every input
    #[arg(short = 'a', long = "augment")]
    augment: bool,

    /// Suppress the trailing unspents extension even when signing is
    /// incomplete
    #[arg(short = 'C', long = "no-unspents")]
    suppress_unspents: bool,

    /// Fee in satoshis deducted when assembling a transaction
    #[arg(long = "fee", default_value_t = 10_000)]
    fee: u64,

    /// Interpret and render addresses for testnet
    #[arg(long = "testnet")]
    testnet: bool,
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let source = ChainedSource::from_env();
    let parsed = ParsedItems::parse(&args.items, &source)?;

    let mut transactions = parsed.transactions;

    // Spendables plus destinations with no transaction on the command
    // line means: build one.
    if transactions.is_empty() && !parsed.payables.is_empty() {
        transactions.push(build_spend(&parsed.spendables, &parsed.payables, args.fee)?);
    }
    if transactions.is_empty() {
        bail!("nothing to do: no transaction given or assembled");
    }

    let mut ring = KeyRing::new();
    for key in parsed.keys {
        ring.add_key(key);
    }

    for tx in transactions.iter_mut() {
        attach_spendables(tx, &parsed.spendables);
        if args.augment {
            augment_spendables(tx, &source)?;
        }
        if !ring.is_empty() {
            sign_transaction(tx, &ring, SIGHASH_ALL)
                .context("signing transaction inputs")?;
        }
    }

    let network = if args.testnet {
        Network::Testnet
    } else {
        Network::Mainnet
    };

    match &args.output {
        Some(path) => {
            if transactions.len() != 1 {
                bail!("-o expects exactly one resulting transaction, have {}", transactions.len());
            }
            write_output(path, &transactions[0], args.suppress_unspents)
        }
        None => {
            for tx in &transactions {
                let include = include_unspents(tx, args.suppress_unspents);
                print!("{}", render_summary(tx, network, include));
            }
            Ok(())
        }
    }
}

/// The unspents extension rides along while signing is incomplete, so
/// downstream signing has the context it needs - unless suppressed or
/// unavailable.
fn include_unspents(tx: &Transaction, suppress: bool) -> bool {
    if suppress || tx.is_coinbase() || !tx.all_spendables_attached() {
        return false;
    }
    let statuses = verify_all_inputs(tx);
    !statuses.iter().all(|s| *s == InputStatus::SigOk)
}

/// Write the transaction to a file: binary when the extension suggests
/// it, hex text otherwise.
fn write_output(path: &Path, tx: &Transaction, suppress_unspents: bool) -> Result<()> {
    let bytes = if include_unspents(tx, suppress_unspents) {
        tx.to_bytes_with_spendables()
            .context("serializing with unspents")?
    } else {
        tx.to_bytes()
    };

    let binary = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("bin") | Some("tx")
    );

    if binary {
        std::fs::write(path, &bytes)
            .with_context(|| format!("writing {}", path.display()))?;
    } else {
        std::fs::write(path, hex::encode(&bytes))
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}
