//! End-to-end: construct, emit, reload, sign, and verify a spend.

use txkit_primitives::ec::PrivateKey;
use txkit_script::template;
use txkit_script::Script;
use txkit_transaction::sighash::SIGHASH_ALL;
use txkit_transaction::solver::{sign_transaction, KeyRing};
use txkit_transaction::verify::{verify_all_inputs, InputStatus};
use txkit_transaction::{Spendable, Transaction, TransactionInput, TransactionOutput};

/// WIF for private scalar 1, compressed.
const WIF: &str = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";

/// A fabricated coinbase transaction paying 50 BTC to the WIF key's
/// P2PKH address.
fn coinbase_to_key(key: &PrivateKey) -> Transaction {
    let mut coinbase_input = TransactionInput::new();
    coinbase_input.source_index = 0xffff_ffff;
    coinbase_input.unlocking_script = Some(Script::from_hex("04ffff001d0104").unwrap());

    let mut tx = Transaction::new();
    tx.add_input(coinbase_input);
    tx.add_output(TransactionOutput::new(
        5_000_000_000,
        template::p2pkh_lock(&key.public_key().hash160()),
    ));
    tx
}

#[test]
fn construct_sign_and_verify_round_trip() {
    let key = PrivateKey::from_wif(WIF).unwrap();
    let source_tx = coinbase_to_key(&key);
    assert!(source_tx.is_coinbase());

    // Construct the unsigned spend: 49999.9 mBTC out, 0.1 mBTC fee.
    let spendable = Spendable::from_tx_out(&source_tx, 0).unwrap();
    let mut tx = Transaction::new();
    tx.add_input(TransactionInput::from_spendable(spendable));
    tx.add_output(TransactionOutput::new(
        4_999_990_000,
        template::p2pkh_lock(&[0x42; 20]),
    ));
    assert_eq!(tx.fee(), Some(10_000));

    // Unsigned: the input does not verify yet.
    assert_eq!(verify_all_inputs(&tx), vec![InputStatus::BadSig]);

    // Emit with the unspents extension and reload; context survives.
    let unsigned_id = tx.txid();
    let emitted = tx.to_bytes_with_spendables().unwrap();
    let mut reloaded = Transaction::from_bytes_with_spendables(&emitted).unwrap();
    assert_eq!(reloaded.txid(), unsigned_id);
    assert!(reloaded.all_spendables_attached());

    // Sign the reloaded transaction.
    let mut ring = KeyRing::new();
    ring.add_key(key);
    let outcome = sign_transaction(&mut reloaded, &ring, SIGHASH_ALL).unwrap();
    assert_eq!(outcome.signed, 1);

    // Signed: every input verifies, and the id changed with the script.
    assert_eq!(verify_all_inputs(&reloaded), vec![InputStatus::SigOk]);
    assert_ne!(reloaded.txid(), unsigned_id);

    // The P2PKH output keeps the canonical suffix through signing.
    assert!(reloaded.to_hex().ends_with("ac00000000"));

    // Save and reload the signed form; bytes are preserved exactly.
    let signed_bytes = reloaded.to_bytes();
    let reparsed = Transaction::from_bytes(&signed_bytes).unwrap();
    assert_eq!(reparsed.to_bytes(), signed_bytes);

    // Signing again changes nothing.
    let mut again = Transaction::from_bytes_with_spendables(
        &reloaded.to_bytes_with_spendables().unwrap(),
    )
    .unwrap();
    let outcome = sign_transaction(&mut again, &ring, SIGHASH_ALL).unwrap();
    assert_eq!(outcome.already_valid, 1);
    assert_eq!(again.to_bytes(), signed_bytes);
}

#[test]
fn two_output_spend_round_trips() {
    let key = PrivateKey::from_wif(WIF).unwrap();
    let source_tx = coinbase_to_key(&key);

    // 123.45678 mBTC in, 123.35678 mBTC out, 0.1 mBTC fee.
    let spendable = Spendable {
        source_txid: *source_tx.txid().as_bytes(),
        source_index: 1,
        locking_script: template::p2pkh_lock(&key.public_key().hash160()),
        satoshis: 12_345_678,
    };
    let mut tx = Transaction::new();
    tx.add_input(TransactionInput::from_spendable(spendable));
    tx.add_output(TransactionOutput::new(
        12_235_678,
        template::p2pkh_lock(&[0x11; 20]),
    ));
    tx.add_output(TransactionOutput::new(
        100_000,
        template::p2pkh_lock(&[0x22; 20]),
    ));
    assert_eq!(tx.fee(), Some(10_000));

    let mut ring = KeyRing::new();
    ring.add_key(key);
    sign_transaction(&mut tx, &ring, SIGHASH_ALL).unwrap();
    assert_eq!(verify_all_inputs(&tx), vec![InputStatus::SigOk]);

    let bytes = tx.to_bytes();
    let reparsed = Transaction::from_bytes(&bytes).unwrap();
    assert_eq!(reparsed.to_bytes(), bytes);
    assert_eq!(reparsed.txid(), tx.txid());
}
