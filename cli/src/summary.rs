//! Human-readable transaction summary.
//!
//! Renders version, id, size, lock-time interpretation, per-input and
//! per-output lines with addresses and values where known, totals and
//! fees, the hex dump, and the final validation line. Amounts display
//! as mBTC with five decimal places.

use std::fmt::Write;

use txkit_script::template::ScriptTemplate;
use txkit_script::Network;
use txkit_transaction::verify::{verify_all_inputs, InputStatus};
use txkit_transaction::Transaction;

/// Satoshis per mBTC.
const SATOSHIS_PER_MBTC: u64 = 100_000;

/// Lock-time values below this are block heights, above are timestamps.
const LOCK_TIME_THRESHOLD: u32 = 500_000_000;

/// Format a satoshi amount as mBTC with five decimals.
///
/// # Arguments
/// * `satoshis` - The amount in satoshis.
///
/// # Returns
/// e.g. `"50000.00000 mBTC"`.
pub fn format_mbtc(satoshis: u64) -> String {
    format!(
        "{}.{:05} mBTC",
        satoshis / SATOSHIS_PER_MBTC,
        satoshis % SATOSHIS_PER_MBTC
    )
}

/// Format a signed satoshi amount (fees can be negative while a
/// transaction is under construction).
fn format_mbtc_signed(satoshis: i64) -> String {
    if satoshis < 0 {
        format!("-{}", format_mbtc(satoshis.unsigned_abs()))
    } else {
        format_mbtc(satoshis as u64)
    }
}

/// Describe the lock-time field.
fn describe_lock_time(lock_time: u32) -> String {
    if lock_time == 0 {
        "valid anytime".to_string()
    } else if lock_time < LOCK_TIME_THRESHOLD {
        format!("valid after block {}", lock_time)
    } else {
        format!("valid after timestamp {}", lock_time)
    }
}

/// Render the full summary of a transaction.
///
/// # Arguments
/// * `tx` - The transaction.
/// * `network` - The network for address rendering.
/// * `include_unspents` - Whether the hex dump carries the unspents
///   extension (the caller decides; falls back to the plain dump when
///   spendables are missing).
///
/// # Returns
/// The multi-line summary.
pub fn render_summary(tx: &Transaction, network: Network, include_unspents: bool) -> String {
    let mut out = String::new();
    let statuses = verify_all_inputs(tx);
    let is_coinbase = tx.is_coinbase();

    writeln!(out, "version      {}", tx.version).unwrap();
    writeln!(out, "id           {}", tx.txid_hex()).unwrap();
    writeln!(out, "size         {} bytes", tx.size()).unwrap();
    writeln!(out, "lock time    {}", describe_lock_time(tx.lock_time)).unwrap();

    // Inputs
    writeln!(out, "inputs ({}):", tx.inputs.len()).unwrap();
    for (i, input) in tx.inputs.iter().enumerate() {
        if input.is_coinbase() {
            let value = if is_coinbase {
                format!("  {}", format_mbtc(tx.total_output_satoshis()))
            } else {
                String::new()
            };
            writeln!(out, "  {:3}: COINBASE{}", i, value).unwrap();
            continue;
        }

        let payer = input
            .spendable
            .as_ref()
            .and_then(|s| ScriptTemplate::classify(&s.locking_script).address(network))
            .map(|a| a.to_string())
            .unwrap_or_else(|| "(unknown)".to_string());

        let outpoint = format!(
            "{}:{}",
            txkit_primitives::chainhash::Hash::new(input.source_txid),
            input.source_index
        );

        let mut line = format!("  {:3}: {} from {}", i, payer, outpoint);
        if let Some(satoshis) = input.source_satoshis() {
            write!(line, "  {}", format_mbtc(satoshis)).unwrap();
        }
        match statuses[i] {
            InputStatus::SigOk => line.push_str("  sig ok"),
            InputStatus::BadSig => line.push_str("  BAD SIG"),
            InputStatus::Unknown => {}
        }
        writeln!(out, "{}", line).unwrap();
    }

    // Outputs
    writeln!(out, "outputs ({}):", tx.outputs.len()).unwrap();
    for (i, output) in tx.outputs.iter().enumerate() {
        let receiver = ScriptTemplate::classify(&output.locking_script)
            .address(network)
            .map(|a| a.to_string())
            .unwrap_or_else(|| format!("script {}", output.locking_script.to_hex()));
        writeln!(
            out,
            "  {:3}: {} receives {}",
            i,
            receiver,
            format_mbtc(output.satoshis)
        )
        .unwrap();
    }

    // Totals. A coinbase transaction's incoming value is by definition
    // its outgoing value (the block reward), fee zero.
    let total_out = tx.total_output_satoshis();
    let total_in = if is_coinbase {
        Some(total_out)
    } else {
        tx.total_input_satoshis()
    };
    if let Some(total_in) = total_in {
        writeln!(out, "total input  {}", format_mbtc(total_in)).unwrap();
    }
    writeln!(out, "total output {}", format_mbtc(total_out)).unwrap();
    if let Some(total_in) = total_in {
        let fee = total_in as i64 - total_out as i64;
        writeln!(out, "fee          {}", format_mbtc_signed(fee)).unwrap();
    }

    // Hex dump, with the extension when requested and possible.
    let extended = if include_unspents {
        tx.to_hex_with_spendables().ok()
    } else {
        None
    };
    match extended {
        Some(hex_dump) => {
            writeln!(out, "hex dump (including unspents):").unwrap();
            writeln!(out, "{}", hex_dump).unwrap();
        }
        None => {
            writeln!(out, "hex dump:").unwrap();
            writeln!(out, "{}", tx.to_hex()).unwrap();
        }
    }

    // The validation line: every attached spendable verified.
    let any_bad = statuses.iter().any(|s| *s == InputStatus::BadSig);
    if !any_bad {
        writeln!(out, "all incoming transaction values validated").unwrap();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use txkit_primitives::ec::PrivateKey;
    use txkit_script::template;
    use txkit_transaction::sighash::SIGHASH_ALL;
    use txkit_transaction::solver::{sign_transaction, KeyRing};
    use txkit_transaction::{Spendable, TransactionInput, TransactionOutput};

    const BLOCK1_COINBASE_HEX: &str =
        "01000000010000000000000000000000000000000000000000000000000000000000000000\
         ffffffff0704ffff001d0104ffffffff0100f2052a0100000043410496b538e853519c726a\
         2c91e61ec11600ae1390813a627c66fb8be7947be63c52da7589379515d4e0a604f8141781\
         e62294721166bf621e73a82cbf2342c858eeac00000000";

    #[test]
    fn test_format_mbtc() {
        assert_eq!(format_mbtc(5_000_000_000), "50000.00000 mBTC");
        assert_eq!(format_mbtc(4_999_990_000), "49999.90000 mBTC");
        assert_eq!(format_mbtc(10_000), "0.10000 mBTC");
        assert_eq!(format_mbtc(1), "0.00001 mBTC");
        assert_eq!(format_mbtc(0), "0.00000 mBTC");
        assert_eq!(format_mbtc(1_000_000_000_000), "10000000.00000 mBTC");
    }

    #[test]
    fn test_describe_lock_time() {
        assert_eq!(describe_lock_time(0), "valid anytime");
        assert_eq!(describe_lock_time(400_000), "valid after block 400000");
        assert_eq!(
            describe_lock_time(1_700_000_000),
            "valid after timestamp 1700000000"
        );
    }

    /// The coinbase summary labels its input, equates totals, and ends
    /// with the validation line.
    #[test]
    fn test_coinbase_summary() {
        let tx = Transaction::from_hex(BLOCK1_COINBASE_HEX).unwrap();
        let summary = render_summary(&tx, Network::Mainnet, false);

        assert!(summary.contains("COINBASE"));
        assert!(summary.contains("12c6DSiU4Rq3P4ZxziKxzrL5LmMBrzjrJX"));
        assert!(summary.contains("total input  50000.00000 mBTC"));
        assert!(summary.contains("total output 50000.00000 mBTC"));
        assert!(summary.contains("fee          0.00000 mBTC"));
        assert!(summary.contains("all incoming transaction values validated"));
    }

    fn signed_spend() -> (Transaction, PrivateKey) {
        let key = PrivateKey::from_wif(
            "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn",
        )
        .unwrap();
        let lock = template::p2pkh_lock(&key.public_key().hash160());
        let mut tx = Transaction::new();
        tx.add_input(TransactionInput::from_spendable(Spendable {
            source_txid: [0x21; 32],
            source_index: 0,
            locking_script: lock,
            satoshis: 5_000_000_000,
        }));
        tx.add_output(TransactionOutput::new(
            4_999_990_000,
            template::p2pkh_lock(&[0x77; 20]),
        ));
        (tx, key)
    }

    /// Unsigned with spendable: BAD SIG, totals present, no validation
    /// line, extended hex dump.
    #[test]
    fn test_unsigned_summary() {
        let (tx, _key) = signed_spend();
        let summary = render_summary(&tx, Network::Mainnet, true);

        assert!(summary.contains("BAD SIG"));
        assert!(summary.contains("total input  50000.00000 mBTC"));
        assert!(summary.contains("fee          0.10000 mBTC"));
        assert!(summary.contains("hex dump (including unspents):"));
        assert!(!summary.contains("all incoming transaction values validated"));
        // Payer address of the generator-key P2PKH output.
        assert!(summary.contains("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"));
    }

    /// Signed: sig ok and the validation line.
    #[test]
    fn test_signed_summary() {
        let (mut tx, key) = signed_spend();
        let mut ring = KeyRing::new();
        ring.add_key(key);
        sign_transaction(&mut tx, &ring, SIGHASH_ALL).unwrap();

        let summary = render_summary(&tx, Network::Mainnet, false);
        assert!(summary.contains("sig ok"));
        assert!(!summary.contains("BAD SIG"));
        assert!(summary.contains("all incoming transaction values validated"));
        assert!(summary.contains("hex dump:"));
    }

    /// Without a spendable, totals-input and fee lines are absent.
    #[test]
    fn test_summary_without_spendable() {
        let (mut tx, _key) = signed_spend();
        tx.inputs[0].spendable = None;
        let summary = render_summary(&tx, Network::Mainnet, false);
        assert!(!summary.contains("total input"));
        assert!(!summary.contains("fee "));
        assert!(summary.contains("(unknown)"));
        assert!(summary.contains("total output"));
    }
}
