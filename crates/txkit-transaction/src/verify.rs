//! Per-input script verification.
//!
//! Bridges the script interpreter to the transaction: implements the
//! interpreter's `TxContext` by computing the legacy signature hash for
//! the input under the executing subscript and checking the ECDSA
//! signature.

use txkit_primitives::ec::{PublicKey, Signature};
use txkit_script::interpreter::{Engine, InterpreterError, TxContext};
use txkit_script::Script;

use crate::sighash;
use crate::transaction::Transaction;

/// `TxContext` implementation over a transaction being verified.
pub struct TxSignatureContext<'a> {
    tx: &'a Transaction,
}

impl<'a> TxSignatureContext<'a> {
    /// Wrap a transaction for use by the interpreter.
    pub fn new(tx: &'a Transaction) -> Self {
        TxSignatureContext { tx }
    }
}

impl<'a> TxContext for TxSignatureContext<'a> {
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_idx: usize,
    ) -> Result<bool, InterpreterError> {
        // The hash type rides as the final byte of the pushed signature.
        let (der, hash_type) = match full_sig.split_last() {
            Some((last, rest)) => (rest, *last as u32),
            None => return Ok(false),
        };

        let signature = match Signature::from_der(der) {
            Ok(sig) => sig,
            Err(_) => return Ok(false),
        };
        let public_key = match PublicKey::from_bytes(pub_key) {
            Ok(key) => key,
            Err(_) => return Ok(false),
        };

        let digest = match sighash::signature_hash(self.tx, input_idx, sub_script, hash_type) {
            Ok(digest) => digest,
            Err(_) => return Ok(false),
        };

        Ok(signature.verify(&digest, &public_key))
    }
}

/// Verify one input's scripts against its attached spendable.
///
/// Runs `unlocking_script` then the spendable's locking script through
/// the interpreter (including P2SH redeem evaluation). An input without
/// a spendable, or a coinbase input, does not verify.
///
/// # Arguments
/// * `tx` - The transaction.
/// * `input_index` - The input to verify.
///
/// # Returns
/// `true` when the input's scripts validate.
pub fn verify_input(tx: &Transaction, input_index: usize) -> bool {
    let input = match tx.inputs.get(input_index) {
        Some(input) => input,
        None => return false,
    };
    if input.is_coinbase() {
        return false;
    }
    let spendable = match &input.spendable {
        Some(spendable) => spendable,
        None => return false,
    };

    let unlocking = input
        .unlocking_script
        .clone()
        .unwrap_or_default();

    let ctx = TxSignatureContext::new(tx);
    Engine::new()
        .execute(&unlocking, &spendable.locking_script, Some(&ctx), input_index)
        .is_ok()
}

/// The verification status of one input in a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStatus {
    /// The input's scripts validate against its spendable.
    SigOk,
    /// A spendable is attached but the scripts do not validate.
    BadSig,
    /// No spendable is attached (or the input is a coinbase); nothing
    /// to verify against.
    Unknown,
}

/// Verify every input independently.
///
/// A failing input never aborts the others.
///
/// # Arguments
/// * `tx` - The transaction.
///
/// # Returns
/// One status per input, in order.
pub fn verify_all_inputs(tx: &Transaction) -> Vec<InputStatus> {
    (0..tx.inputs.len())
        .map(|i| {
            let input = &tx.inputs[i];
            if input.is_coinbase() || input.spendable.is_none() {
                InputStatus::Unknown
            } else if verify_input(tx, i) {
                InputStatus::SigOk
            } else {
                InputStatus::BadSig
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::TransactionInput;
    use crate::output::TransactionOutput;
    use crate::sighash::SIGHASH_ALL;
    use crate::solver::{sign_transaction, KeyRing};
    use crate::spendable::Spendable;
    use txkit_primitives::ec::PrivateKey;
    use txkit_script::template;

    fn test_key(byte: u8) -> PrivateKey {
        let mut secret = [0u8; 32];
        secret[31] = byte;
        PrivateKey::from_bytes(&secret).unwrap()
    }

    fn signed_spend(key: &PrivateKey) -> Transaction {
        let lock = template::p2pkh_lock(&key.public_key().hash160());
        let spendable = Spendable {
            source_txid: [0x55; 32],
            source_index: 1,
            locking_script: lock,
            satoshis: 250_000,
        };
        let mut tx = Transaction::new();
        tx.add_input(TransactionInput::from_spendable(spendable));
        tx.add_output(TransactionOutput::new(
            240_000,
            template::p2pkh_lock(&[0x42; 20]),
        ));

        let mut ring = KeyRing::new();
        ring.add_key(key.clone());
        sign_transaction(&mut tx, &ring, SIGHASH_ALL).unwrap();
        tx
    }

    #[test]
    fn test_verify_signed_input() {
        let tx = signed_spend(&test_key(21));
        assert!(verify_input(&tx, 0));
        assert_eq!(verify_all_inputs(&tx), vec![InputStatus::SigOk]);
    }

    #[test]
    fn test_unsigned_input_is_bad_sig() {
        let mut tx = signed_spend(&test_key(22));
        tx.inputs[0].unlocking_script = None;
        assert!(!verify_input(&tx, 0));
        assert_eq!(verify_all_inputs(&tx), vec![InputStatus::BadSig]);
    }

    /// Changing an output after signing invalidates the signature.
    #[test]
    fn test_tampered_output_fails() {
        let mut tx = signed_spend(&test_key(23));
        tx.outputs[0].satoshis += 1;
        assert!(!verify_input(&tx, 0));
    }

    /// A spendable locked to a different key rejects the signature.
    #[test]
    fn test_wrong_previous_output_fails() {
        let mut tx = signed_spend(&test_key(24));
        let other = test_key(25);
        tx.inputs[0].spendable.as_mut().unwrap().locking_script =
            template::p2pkh_lock(&other.public_key().hash160());
        assert!(!verify_input(&tx, 0));
    }

    #[test]
    fn test_no_spendable_is_unknown() {
        let mut tx = signed_spend(&test_key(26));
        tx.inputs[0].spendable = None;
        assert!(!verify_input(&tx, 0));
        assert_eq!(verify_all_inputs(&tx), vec![InputStatus::Unknown]);
    }

    #[test]
    fn test_coinbase_is_unknown() {
        let mut tx = Transaction::new();
        let mut input = TransactionInput::new();
        input.source_index = crate::input::COINBASE_INDEX;
        input.unlocking_script = Some(Script::from_hex("04ffff001d0104").unwrap());
        tx.add_input(input);
        tx.add_output(TransactionOutput::new(
            5_000_000_000,
            template::p2pkh_lock(&[0x01; 20]),
        ));
        assert_eq!(verify_all_inputs(&tx), vec![InputStatus::Unknown]);
    }

    /// One bad input does not abort verification of the others.
    #[test]
    fn test_mixed_inputs_verified_independently() {
        let key_a = test_key(27);
        let key_b = test_key(28);

        let lock_a = template::p2pkh_lock(&key_a.public_key().hash160());
        let lock_b = template::p2pkh_lock(&key_b.public_key().hash160());

        let mut tx = Transaction::new();
        tx.add_input(TransactionInput::from_spendable(Spendable {
            source_txid: [0x01; 32],
            source_index: 0,
            locking_script: lock_a,
            satoshis: 10_000,
        }));
        tx.add_input(TransactionInput::from_spendable(Spendable {
            source_txid: [0x02; 32],
            source_index: 0,
            locking_script: lock_b,
            satoshis: 20_000,
        }));
        tx.add_output(TransactionOutput::new(
            25_000,
            template::p2pkh_lock(&[0x11; 20]),
        ));

        // Only key A is available; input 1 stays unsigned.
        let mut ring = KeyRing::new();
        ring.add_key(key_a);
        sign_transaction(&mut tx, &ring, SIGHASH_ALL).unwrap();

        assert_eq!(
            verify_all_inputs(&tx),
            vec![InputStatus::SigOk, InputStatus::BadSig]
        );
    }
}
