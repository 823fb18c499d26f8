//! Positional-argument classification and transaction assembly.
//!
//! The command line accepts any mixture of transactions (hex, file
//! path, or txid resolved through the transaction source), spendable
//! descriptors, WIF private keys, and destinations (addresses or raw
//! script hex, optionally with an explicit satoshi amount). This module
//! sorts the arguments into those categories and assembles a spend from
//! spendables plus destinations.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use txkit_primitives::chainhash::Hash;
use txkit_primitives::ec::PrivateKey;
use txkit_script::template;
use txkit_script::{Address, Script};
use txkit_transaction::{Spendable, Transaction, TransactionInput, TransactionOutput};

use crate::source::TxSource;

/// A destination for funds: a locking script and an optional explicit
/// amount. A destination without an amount receives a share of the
/// residual.
pub struct Payable {
    pub script: Script,
    pub satoshis: Option<u64>,
}

/// The classified command-line items.
#[derive(Default)]
pub struct ParsedItems {
    pub transactions: Vec<Transaction>,
    pub spendables: Vec<Spendable>,
    pub keys: Vec<PrivateKey>,
    pub payables: Vec<Payable>,
}

impl ParsedItems {
    /// Classify every positional argument.
    ///
    /// # Arguments
    /// * `items` - The raw positional arguments.
    /// * `source` - The transaction source for resolving txids.
    ///
    /// # Returns
    /// The sorted items, or an error naming the first argument that
    /// fits no category.
    pub fn parse(items: &[String], source: &dyn TxSource) -> Result<Self> {
        let mut parsed = ParsedItems::default();
        for item in items {
            parsed.classify(item, source)?;
        }
        Ok(parsed)
    }

    fn classify(&mut self, item: &str, source: &dyn TxSource) -> Result<()> {
        // A path to a file holding raw binary or whole-file hex.
        if Path::new(item).is_file() {
            self.transactions.push(load_tx_file(item)?);
            return Ok(());
        }

        // A WIF private key.
        if let Ok(key) = PrivateKey::from_wif(item) {
            self.keys.push(key);
            return Ok(());
        }

        // A bare destination address.
        if let Ok(address) = Address::from_string(item) {
            self.payables.push(Payable {
                script: template::lock_for_address(&address),
                satoshis: None,
            });
            return Ok(());
        }

        // address/amount with an explicit satoshi value.
        if let Some((addr_part, amount_part)) = item.split_once('/') {
            if let (Ok(address), Ok(satoshis)) =
                (Address::from_string(addr_part), amount_part.parse::<u64>())
            {
                self.payables.push(Payable {
                    script: template::lock_for_address(&address),
                    satoshis: Some(satoshis),
                });
                return Ok(());
            }
        }

        // A txid/index/script/value spendable descriptor.
        if item.matches('/').count() == 3 {
            if let Ok(spendable) = Spendable::from_descriptor(item) {
                self.spendables.push(spendable);
                return Ok(());
            }
        }

        // A 64-character txid, resolved through the transaction source.
        if item.len() == 64 && item.chars().all(|c| c.is_ascii_hexdigit()) {
            let txid = Hash::from_hex(item)?;
            let tx = source
                .lookup(&txid)
                .with_context(|| format!("resolving transaction {}", txid))?
                .ok_or_else(|| anyhow!("transaction {} not found by any source", txid))?;
            self.transactions.push(tx);
            return Ok(());
        }

        // Transaction hex, possibly carrying the unspents extension.
        if let Ok(tx) = Transaction::from_hex_with_spendables(item) {
            self.transactions.push(tx);
            return Ok(());
        }

        // Raw destination script hex, the last resort for hex input.
        if item.len() % 2 == 0 && !item.is_empty() && item.chars().all(|c| c.is_ascii_hexdigit())
        {
            let script = Script::from_hex(item)?;
            self.payables.push(Payable {
                script,
                satoshis: None,
            });
            return Ok(());
        }

        bail!(
            "cannot make sense of argument '{}': not a transaction, file, txid, \
             spendable, WIF key, address, or script hex",
            item
        )
    }
}

/// Load a transaction from a file of raw binary or whole-file hex.
fn load_tx_file(path: &str) -> Result<Transaction> {
    let raw = fs::read(path).with_context(|| format!("reading {}", path))?;
    // Whole-file hex: ASCII hex digits plus whitespace.
    if let Ok(text) = std::str::from_utf8(&raw) {
        let compact: String = text.split_whitespace().collect();
        if !compact.is_empty() && compact.chars().all(|c| c.is_ascii_hexdigit()) {
            if let Ok(bytes) = hex::decode(&compact) {
                return Transaction::from_bytes_with_spendables(&bytes)
                    .with_context(|| format!("parsing hex transaction from {}", path));
            }
        }
    }
    Transaction::from_bytes_with_spendables(&raw)
        .with_context(|| format!("parsing binary transaction from {}", path))
}

/// Assemble an unsigned spend from spendables and destinations.
///
/// Each destination with an explicit amount receives it; the residual
/// (input total minus explicit outputs minus the fee) is split across
/// the destinations without one.
///
/// # Arguments
/// * `spendables` - The previous outputs to consume.
/// * `payables` - The destinations.
/// * `fee` - The fee in satoshis.
///
/// # Returns
/// The unsigned transaction with spendables attached to its inputs.
pub fn build_spend(
    spendables: &[Spendable],
    payables: &[Payable],
    fee: u64,
) -> Result<Transaction> {
    if spendables.is_empty() {
        bail!("building a transaction requires at least one spendable");
    }
    if payables.is_empty() {
        bail!("building a transaction requires at least one destination");
    }

    let total_in: u64 = spendables.iter().map(|s| s.satoshis).sum();
    let explicit: u64 = payables.iter().filter_map(|p| p.satoshis).sum();
    let residual_count = payables.iter().filter(|p| p.satoshis.is_none()).count();

    let committed = explicit
        .checked_add(fee)
        .ok_or_else(|| anyhow!("outputs plus fee overflow"))?;
    if committed > total_in {
        bail!(
            "not enough funds: inputs total {} satoshis, outputs plus fee need {}",
            total_in,
            committed
        );
    }
    let residual = total_in - committed;
    if residual_count == 0 && residual > 0 {
        bail!(
            "{} satoshis are unclaimed; add a destination without an amount to receive the residual",
            residual
        );
    }

    let mut tx = Transaction::new();
    for spendable in spendables {
        tx.add_input(TransactionInput::from_spendable(spendable.clone()));
    }

    // Split the residual evenly, remainder to the first residual output.
    let share = if residual_count > 0 {
        residual / residual_count as u64
    } else {
        0
    };
    let mut remainder = if residual_count > 0 {
        residual % residual_count as u64
    } else {
        0
    };
    for payable in payables {
        let satoshis = match payable.satoshis {
            Some(amount) => amount,
            None => {
                let extra = std::mem::take(&mut remainder);
                share + extra
            }
        };
        tx.add_output(TransactionOutput::new(satoshis, payable.script.clone()));
    }

    Ok(tx)
}

/// Attach provided spendables to any transaction inputs that reference
/// their outpoints.
///
/// # Arguments
/// * `tx` - The transaction to annotate.
/// * `spendables` - Candidate previous outputs.
pub fn attach_spendables(tx: &mut Transaction, spendables: &[Spendable]) {
    for input in tx.inputs.iter_mut() {
        if input.spendable.is_some() {
            continue;
        }
        if let Some(spendable) = spendables.iter().find(|s| {
            s.source_txid == input.source_txid && s.source_index == input.source_index
        }) {
            input.spendable = Some(spendable.clone());
        }
    }
}

/// Resolve missing spendables through the transaction source.
///
/// Each input without a spendable has its source transaction looked up
/// and the referenced output attached. Failures to resolve surface as
/// errors; coinbase inputs are skipped.
///
/// # Arguments
/// * `tx` - The transaction to augment.
/// * `source` - The transaction source.
pub fn augment_spendables(tx: &mut Transaction, source: &dyn TxSource) -> Result<()> {
    for input_index in 0..tx.inputs.len() {
        let input = &tx.inputs[input_index];
        if input.is_coinbase() || input.spendable.is_some() {
            continue;
        }
        let txid = Hash::new(input.source_txid);
        let source_tx = source
            .lookup(&txid)?
            .ok_or_else(|| anyhow!("previous transaction {} not found by any source", txid))?;
        let spendable = Spendable::from_tx_out(&source_tx, input.source_index)
            .with_context(|| format!("input {} references {}", input_index, txid))?;
        tx.inputs[input_index].spendable = Some(spendable);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use txkit_primitives::hash::hash160;

    const BLOCK1_COINBASE_HEX: &str =
        "01000000010000000000000000000000000000000000000000000000000000000000000000\
         ffffffff0704ffff001d0104ffffffff0100f2052a0100000043410496b538e853519c726a\
         2c91e61ec11600ae1390813a627c66fb8be7947be63c52da7589379515d4e0a604f8141781\
         e62294721166bf621e73a82cbf2342c858eeac00000000";

    const BLOCK1_COINBASE_TXID: &str =
        "0e3e2357e806b6cdb1f70b54c3a3a17b6714ee1f0e68bebb44a74b1efd512098";

    fn block1_descriptor() -> String {
        let tx = Transaction::from_hex(BLOCK1_COINBASE_HEX).unwrap();
        Spendable::from_tx_out(&tx, 0).unwrap().to_descriptor()
    }

    #[test]
    fn test_classify_mixture() {
        let source = MemorySource::new();
        let items = vec![
            BLOCK1_COINBASE_HEX.to_string(),
            block1_descriptor(),
            "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn".to_string(),
            "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH".to_string(),
            "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH/12345".to_string(),
        ];
        let parsed = ParsedItems::parse(&items, &source).expect("all classify");
        assert_eq!(parsed.transactions.len(), 1);
        assert_eq!(parsed.spendables.len(), 1);
        assert_eq!(parsed.keys.len(), 1);
        assert_eq!(parsed.payables.len(), 2);
        assert_eq!(parsed.payables[0].satoshis, None);
        assert_eq!(parsed.payables[1].satoshis, Some(12345));
    }

    #[test]
    fn test_classify_txid_through_source() {
        let tx = Transaction::from_hex(BLOCK1_COINBASE_HEX).unwrap();
        let mut source = MemorySource::new();
        source.add(tx);

        let items = vec![BLOCK1_COINBASE_TXID.to_string()];
        let parsed = ParsedItems::parse(&items, &source).expect("resolves");
        assert_eq!(parsed.transactions.len(), 1);
        assert_eq!(parsed.transactions[0].txid_hex(), BLOCK1_COINBASE_TXID);
    }

    #[test]
    fn test_classify_unresolvable_txid_is_error() {
        let source = MemorySource::new();
        let items = vec![BLOCK1_COINBASE_TXID.to_string()];
        assert!(ParsedItems::parse(&items, &source).is_err());
    }

    #[test]
    fn test_classify_nonsense_is_error() {
        let source = MemorySource::new();
        let items = vec!["definitely not a thing".to_string()];
        assert!(ParsedItems::parse(&items, &source).is_err());
    }

    #[test]
    fn test_build_spend_residual() {
        let source_tx = Transaction::from_hex(BLOCK1_COINBASE_HEX).unwrap();
        let spendable = Spendable::from_tx_out(&source_tx, 0).unwrap();
        let payable = Payable {
            script: template::p2pkh_lock(&[0x31; 20]),
            satoshis: None,
        };

        let tx = build_spend(&[spendable], &[payable], 10_000).expect("builds");
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].satoshis, 5_000_000_000 - 10_000);
        assert_eq!(tx.fee(), Some(10_000));
    }

    #[test]
    fn test_build_spend_explicit_plus_residual() {
        let source_tx = Transaction::from_hex(BLOCK1_COINBASE_HEX).unwrap();
        let spendable = Spendable::from_tx_out(&source_tx, 0).unwrap();
        let explicit = Payable {
            script: template::p2pkh_lock(&[0x32; 20]),
            satoshis: Some(1_000_000),
        };
        let residual = Payable {
            script: template::p2pkh_lock(&[0x33; 20]),
            satoshis: None,
        };

        let tx = build_spend(&[spendable], &[explicit, residual], 10_000).expect("builds");
        assert_eq!(tx.outputs[0].satoshis, 1_000_000);
        assert_eq!(tx.outputs[1].satoshis, 5_000_000_000 - 1_000_000 - 10_000);
    }

    #[test]
    fn test_build_spend_insufficient_funds() {
        let spendable = Spendable {
            source_txid: [1; 32],
            source_index: 0,
            locking_script: template::p2pkh_lock(&[0x34; 20]),
            satoshis: 5_000,
        };
        let payable = Payable {
            script: template::p2pkh_lock(&[0x35; 20]),
            satoshis: Some(10_000),
        };
        assert!(build_spend(&[spendable], &[payable], 1_000).is_err());
    }

    #[test]
    fn test_attach_spendables_by_outpoint() {
        let source_tx = Transaction::from_hex(BLOCK1_COINBASE_HEX).unwrap();
        let spendable = Spendable::from_tx_out(&source_tx, 0).unwrap();

        let mut tx = Transaction::new();
        let mut input = TransactionInput::new();
        input.source_txid = spendable.source_txid;
        input.source_index = 0;
        tx.add_input(input);
        tx.add_output(TransactionOutput::new(
            1,
            template::p2pkh_lock(&hash160(b"anyone")),
        ));

        attach_spendables(&mut tx, &[spendable.clone()]);
        assert_eq!(tx.inputs[0].spendable, Some(spendable));
    }

    #[test]
    fn test_augment_through_source() {
        let source_tx = Transaction::from_hex(BLOCK1_COINBASE_HEX).unwrap();
        let mut source = MemorySource::new();
        source.add(source_tx.clone());

        let mut tx = Transaction::new();
        let mut input = TransactionInput::new();
        input.source_txid = *source_tx.txid().as_bytes();
        input.source_index = 0;
        tx.add_input(input);
        tx.add_output(TransactionOutput::new(1, template::p2pkh_lock(&[0x36; 20])));

        augment_spendables(&mut tx, &source).expect("resolves");
        assert_eq!(
            tx.inputs[0].spendable.as_ref().map(|s| s.satoshis),
            Some(5_000_000_000)
        );
    }
}
