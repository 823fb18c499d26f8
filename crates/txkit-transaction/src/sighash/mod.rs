//! Signature hash computation for transaction signing.
//!
//! Computes the digest that is signed by ECDSA to authorize spending a
//! transaction input, using the original (legacy) algorithm: the
//! transaction is re-serialized with every other input's script blanked
//! and the subscript substituted at the signed position, modified
//! according to the hash-type flags, then double-SHA256d with the
//! hash type appended as a 4-byte little-endian integer.

use txkit_primitives::hash::sha256d;
use txkit_primitives::util::{ByteWriter, VarInt};
use txkit_script::Script;

use crate::transaction::Transaction;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs (the default).
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs but no outputs, allowing outputs to be modified.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and only the output with the same index as the
/// signed input.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Combined with another flag: only sign the current input, allowing
/// other inputs to be added later.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Mask applied to extract the base sighash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

/// Compute the legacy signature hash for a given input.
///
/// # Arguments
/// * `tx`          - The transaction being signed.
/// * `input_index` - Index of the input being signed.
/// * `subscript`   - The script being satisfied: the previous output's
///   locking script with code separators removed, or the redeem script
///   for a P2SH spend.
/// * `hash_type`   - The sighash flags.
///
/// # Returns
/// A 32-byte digest to be signed by ECDSA.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    subscript: &Script,
    hash_type: u32,
) -> Result<[u8; 32], TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        )));
    }

    let base_type = hash_type & SIGHASH_MASK;
    let anyone_can_pay = hash_type & SIGHASH_ANYONECANPAY != 0;

    // The historical SIGHASH_SINGLE bug: signing an input with no
    // matching output hashes the constant 1 instead of any preimage.
    if base_type == SIGHASH_SINGLE && input_index >= tx.outputs.len() {
        let mut digest = [0u8; 32];
        digest[31] = 1;
        return Ok(digest);
    }

    let mut writer = ByteWriter::with_capacity(256);
    writer.write_u32_le(tx.version);

    // Inputs: either just the signed one (ANYONECANPAY), or all of them
    // with every other script blanked.
    if anyone_can_pay {
        let input = &tx.inputs[input_index];
        writer.write_varint(VarInt(1));
        writer.write_bytes(&input.source_txid);
        writer.write_u32_le(input.source_index);
        writer.write_var_bytes(subscript.to_bytes());
        writer.write_u32_le(input.sequence);
    } else {
        writer.write_varint(VarInt::from(tx.inputs.len()));
        for (j, input) in tx.inputs.iter().enumerate() {
            writer.write_bytes(&input.source_txid);
            writer.write_u32_le(input.source_index);
            if j == input_index {
                writer.write_var_bytes(subscript.to_bytes());
            } else {
                writer.write_var_bytes(&[]);
            }
            // NONE and SINGLE zero the sequence of every other input so
            // those inputs can be replaced.
            let sequence = if j != input_index
                && (base_type == SIGHASH_NONE || base_type == SIGHASH_SINGLE)
            {
                0
            } else {
                input.sequence
            };
            writer.write_u32_le(sequence);
        }
    }

    // Outputs, per the base hash type.
    match base_type {
        SIGHASH_NONE => {
            writer.write_varint(VarInt(0));
        }
        SIGHASH_SINGLE => {
            writer.write_varint(VarInt::from(input_index + 1));
            for _ in 0..input_index {
                // Outputs below the signed index become (-1, empty).
                writer.write_u64_le(u64::MAX);
                writer.write_var_bytes(&[]);
            }
            tx.outputs[input_index].write_to(&mut writer);
        }
        _ => {
            writer.write_varint(VarInt::from(tx.outputs.len()));
            for output in &tx.outputs {
                output.write_to(&mut writer);
            }
        }
    }

    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(hash_type);

    Ok(sha256d(writer.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::TransactionInput;
    use crate::output::TransactionOutput;

    fn two_in_two_out() -> Transaction {
        let mut tx = Transaction::new();
        for i in 0..2u8 {
            let mut input = TransactionInput::new();
            input.source_txid = [i + 1; 32];
            input.source_index = i as u32;
            tx.add_input(input);
        }
        for i in 0..2u64 {
            tx.add_output(TransactionOutput::new(
                1000 + i,
                Script::from_hex("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac").unwrap(),
            ));
        }
        tx
    }

    fn subscript() -> Script {
        Script::from_hex("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac").unwrap()
    }

    #[test]
    fn test_deterministic() {
        let tx = two_in_two_out();
        let a = signature_hash(&tx, 0, &subscript(), SIGHASH_ALL).unwrap();
        let b = signature_hash(&tx, 0, &subscript(), SIGHASH_ALL).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_input_index_out_of_range() {
        let tx = two_in_two_out();
        assert!(signature_hash(&tx, 2, &subscript(), SIGHASH_ALL).is_err());
    }

    #[test]
    fn test_digest_differs_per_input_and_type() {
        let tx = two_in_two_out();
        let d0 = signature_hash(&tx, 0, &subscript(), SIGHASH_ALL).unwrap();
        let d1 = signature_hash(&tx, 1, &subscript(), SIGHASH_ALL).unwrap();
        assert_ne!(d0, d1);

        let none = signature_hash(&tx, 0, &subscript(), SIGHASH_NONE).unwrap();
        let single = signature_hash(&tx, 0, &subscript(), SIGHASH_SINGLE).unwrap();
        assert_ne!(d0, none);
        assert_ne!(d0, single);
        assert_ne!(none, single);
    }

    /// SIGHASH_ALL commits to the outputs.
    #[test]
    fn test_all_commits_to_outputs() {
        let tx = two_in_two_out();
        let before = signature_hash(&tx, 0, &subscript(), SIGHASH_ALL).unwrap();
        let mut modified = tx.clone();
        modified.outputs[1].satoshis += 1;
        let after = signature_hash(&modified, 0, &subscript(), SIGHASH_ALL).unwrap();
        assert_ne!(before, after);
    }

    /// SIGHASH_NONE does not commit to any output.
    #[test]
    fn test_none_ignores_outputs() {
        let tx = two_in_two_out();
        let before = signature_hash(&tx, 0, &subscript(), SIGHASH_NONE).unwrap();
        let mut modified = tx.clone();
        modified.outputs.clear();
        let after = signature_hash(&modified, 0, &subscript(), SIGHASH_NONE).unwrap();
        assert_eq!(before, after);
    }

    /// SIGHASH_SINGLE commits only to the same-index output.
    #[test]
    fn test_single_commits_to_matching_output_only() {
        let tx = two_in_two_out();
        let before = signature_hash(&tx, 0, &subscript(), SIGHASH_SINGLE).unwrap();

        let mut other_changed = tx.clone();
        other_changed.outputs[1].satoshis += 1;
        let after = signature_hash(&other_changed, 0, &subscript(), SIGHASH_SINGLE).unwrap();
        assert_eq!(before, after);

        let mut own_changed = tx.clone();
        own_changed.outputs[0].satoshis += 1;
        let after = signature_hash(&own_changed, 0, &subscript(), SIGHASH_SINGLE).unwrap();
        assert_ne!(before, after);
    }

    /// SIGHASH_SINGLE past the last output is the constant-one digest.
    #[test]
    fn test_single_out_of_range_constant() {
        let mut tx = two_in_two_out();
        tx.outputs.truncate(1);
        let digest = signature_hash(&tx, 1, &subscript(), SIGHASH_SINGLE).unwrap();
        let mut expected = [0u8; 32];
        expected[31] = 1;
        assert_eq!(digest, expected);
    }

    /// ANYONECANPAY does not commit to the other inputs.
    #[test]
    fn test_anyonecanpay_ignores_other_inputs() {
        let tx = two_in_two_out();
        let flags = SIGHASH_ALL | SIGHASH_ANYONECANPAY;
        let before = signature_hash(&tx, 0, &subscript(), flags).unwrap();

        let mut modified = tx.clone();
        modified.inputs[1].source_txid = [0xee; 32];
        let after = signature_hash(&modified, 0, &subscript(), flags).unwrap();
        assert_eq!(before, after);

        // Without the flag the same change alters the digest.
        let before_all = signature_hash(&tx, 0, &subscript(), SIGHASH_ALL).unwrap();
        let after_all = signature_hash(&modified, 0, &subscript(), SIGHASH_ALL).unwrap();
        assert_ne!(before_all, after_all);
    }

    /// The other inputs' unlocking scripts never reach the digest.
    #[test]
    fn test_other_scripts_are_blanked() {
        let tx = two_in_two_out();
        let before = signature_hash(&tx, 0, &subscript(), SIGHASH_ALL).unwrap();
        let mut modified = tx.clone();
        modified.inputs[1].unlocking_script = Some(Script::from_hex("51").unwrap());
        let after = signature_hash(&modified, 0, &subscript(), SIGHASH_ALL).unwrap();
        assert_eq!(before, after);
    }
}
