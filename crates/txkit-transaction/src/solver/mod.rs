//! The solver: produces unlocking scripts for the standard templates.
//!
//! Given a previous output's locking script, the signature hash for the
//! input under a chosen hash type, and a key source, the solver builds
//! the unlocking script that satisfies the template. Inputs whose
//! template is unknown, or for which the key source has no key, are
//! left untouched; signing is maximally tolerant and reports partial
//! state instead of failing.

use std::collections::HashMap;

use txkit_primitives::ec::PrivateKey;
use txkit_primitives::hash::hash160;
use txkit_script::opcodes::OP_0;
use txkit_script::template::ScriptTemplate;
use txkit_script::Script;

use crate::sighash;
use crate::transaction::Transaction;
use crate::verify;
use crate::TransactionError;

/// Read-only lookup of signing material.
///
/// The solver finds private keys either through the hash-160 a P2PKH
/// output commits to (under both the compressed and uncompressed
/// public-key encodings) or through the exact public-key bytes embedded
/// in P2PK and multisig outputs. P2SH resolution goes through the known
/// redeem scripts, keyed by their hash-160.
pub trait KeySource {
    /// Look up a private key by the hash-160 of either of its
    /// public-key encodings.
    fn key_for_hash160(&self, hash: &[u8; 20]) -> Option<&PrivateKey>;

    /// Look up a private key by exact public-key bytes.
    fn key_for_pub_key(&self, pub_key: &[u8]) -> Option<&PrivateKey>;

    /// Look up a known redeem script by its hash-160.
    fn redeem_script(&self, hash: &[u8; 20]) -> Option<&Script>;
}

/// In-memory `KeySource` holding private keys and redeem scripts.
#[derive(Default)]
pub struct KeyRing {
    keys: Vec<PrivateKey>,
    by_hash160: HashMap<[u8; 20], usize>,
    by_pub_key: HashMap<Vec<u8>, usize>,
    redeem_scripts: HashMap<[u8; 20], Script>,
}

impl KeyRing {
    /// Create an empty key ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a private key, indexing it under both public-key encodings
    /// and both hash-160s.
    ///
    /// # Arguments
    /// * `key` - The private key to add.
    pub fn add_key(&mut self, key: PrivateKey) {
        let idx = self.keys.len();
        let pub_key = key.public_key();
        let compressed = pub_key.to_compressed();
        let uncompressed = pub_key.to_uncompressed();

        self.by_hash160.insert(hash160(&compressed), idx);
        self.by_hash160.insert(hash160(&uncompressed), idx);
        self.by_pub_key.insert(compressed, idx);
        self.by_pub_key.insert(uncompressed, idx);
        self.keys.push(key);
    }

    /// Register a redeem script for P2SH solving, keyed by its hash-160.
    ///
    /// # Arguments
    /// * `script` - The redeem script.
    pub fn add_redeem_script(&mut self, script: Script) {
        self.redeem_scripts.insert(hash160(script.to_bytes()), script);
    }

    /// The number of private keys held.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the ring holds no private keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeySource for KeyRing {
    fn key_for_hash160(&self, hash: &[u8; 20]) -> Option<&PrivateKey> {
        self.by_hash160.get(hash).map(|&idx| &self.keys[idx])
    }

    fn key_for_pub_key(&self, pub_key: &[u8]) -> Option<&PrivateKey> {
        self.by_pub_key.get(pub_key).map(|&idx| &self.keys[idx])
    }

    fn redeem_script(&self, hash: &[u8; 20]) -> Option<&Script> {
        self.redeem_scripts.get(hash)
    }
}

/// Counts of what one signing pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SignOutcome {
    /// Inputs that received a fresh unlocking script.
    pub signed: usize,
    /// Inputs whose existing unlocking script already verified and were
    /// left untouched.
    pub already_valid: usize,
    /// Inputs left unsigned: coinbase, missing spendable, unknown
    /// template, or no key available.
    pub skipped: usize,
}

/// Sign every input the key source can satisfy.
///
/// An input whose existing unlocking script already verifies against
/// its spendable is never overwritten, which makes repeated signing
/// passes byte-stable. Inputs that cannot be signed are counted, not
/// failed.
///
/// # Arguments
/// * `tx` - The transaction to sign (unlocking scripts are replaced in
///   place).
/// * `keys` - The key source.
/// * `hash_type` - The sighash flags, e.g. `SIGHASH_ALL`.
///
/// # Returns
/// The per-input outcome counts.
pub fn sign_transaction(
    tx: &mut Transaction,
    keys: &dyn KeySource,
    hash_type: u32,
) -> Result<SignOutcome, TransactionError> {
    let mut outcome = SignOutcome::default();

    for input_index in 0..tx.inputs.len() {
        let input = &tx.inputs[input_index];
        if input.is_coinbase() || input.spendable.is_none() {
            outcome.skipped += 1;
            continue;
        }

        if input.unlocking_script.is_some() && verify::verify_input(tx, input_index) {
            outcome.already_valid += 1;
            continue;
        }

        match solve_input(tx, input_index, hash_type, keys)? {
            Some(script) => {
                tx.inputs[input_index].unlocking_script = Some(script);
                outcome.signed += 1;
            }
            None => outcome.skipped += 1,
        }
    }

    Ok(outcome)
}

/// Produce the unlocking script for one input, if the key source can.
///
/// # Arguments
/// * `tx` - The transaction being signed.
/// * `input_index` - The input to solve.
/// * `hash_type` - The sighash flags.
/// * `keys` - The key source.
///
/// # Returns
/// `Ok(Some(script))` when solved, `Ok(None)` when the template is
/// unknown or keys are missing, `Err(MissingSpendable)` when the input
/// has no previous-output context.
pub fn solve_input(
    tx: &Transaction,
    input_index: usize,
    hash_type: u32,
    keys: &dyn KeySource,
) -> Result<Option<Script>, TransactionError> {
    let input = &tx.inputs[input_index];
    let spendable = input
        .spendable
        .as_ref()
        .ok_or(TransactionError::MissingSpendable(input_index))?;

    let template = ScriptTemplate::classify(&spendable.locking_script);
    let subscript = spendable.locking_script.delete_code_separators();
    solve_template(tx, input_index, &template, &subscript, hash_type, keys, true)
}

/// Solve a classified template against a chosen subscript.
///
/// `allow_script_hash` guards the single level of P2SH recursion: a
/// redeem script that is itself P2SH is not solvable.
fn solve_template(
    tx: &Transaction,
    input_index: usize,
    template: &ScriptTemplate,
    subscript: &Script,
    hash_type: u32,
    keys: &dyn KeySource,
    allow_script_hash: bool,
) -> Result<Option<Script>, TransactionError> {
    match template {
        ScriptTemplate::P2pkh { hash160: hash } => {
            let key = match keys.key_for_hash160(hash) {
                Some(key) => key,
                None => return Ok(None),
            };
            // The pushed public key must be the encoding the output's
            // hash actually commits to.
            let pub_key = key.public_key();
            let compressed = pub_key.to_compressed();
            let pub_bytes = if &hash160(&compressed) == hash {
                compressed
            } else {
                pub_key.to_uncompressed()
            };

            let sig = sign_one(tx, input_index, subscript, hash_type, key)?;
            let mut script = Script::new();
            script.append_push_data(&sig)?;
            script.append_push_data(&pub_bytes)?;
            Ok(Some(script))
        }

        ScriptTemplate::P2pk { pub_key } => {
            let key = match keys.key_for_pub_key(pub_key) {
                Some(key) => key,
                None => return Ok(None),
            };
            let sig = sign_one(tx, input_index, subscript, hash_type, key)?;
            let mut script = Script::new();
            script.append_push_data(&sig)?;
            Ok(Some(script))
        }

        ScriptTemplate::Multisig { required, pub_keys } => {
            // Collect signatures in the order the keys appear in the
            // script; fewer than `required` available keys leaves the
            // input unsigned.
            let mut sigs = Vec::with_capacity(*required);
            for pub_key in pub_keys {
                if sigs.len() == *required {
                    break;
                }
                if let Some(key) = keys.key_for_pub_key(pub_key) {
                    sigs.push(sign_one(tx, input_index, subscript, hash_type, key)?);
                }
            }
            if sigs.len() < *required {
                return Ok(None);
            }

            // The leading OP_0 absorbs the extra pop in CHECKMULTISIG.
            let mut script = Script::new();
            script.append_opcodes(&[OP_0])?;
            for sig in &sigs {
                script.append_push_data(sig)?;
            }
            Ok(Some(script))
        }

        ScriptTemplate::P2sh { hash160: hash } => {
            if !allow_script_hash {
                return Ok(None);
            }
            let redeem = match keys.redeem_script(hash) {
                Some(redeem) => redeem.clone(),
                None => return Ok(None),
            };
            let inner_template = ScriptTemplate::classify(&redeem);
            let inner_subscript = redeem.delete_code_separators();
            let solved = solve_template(
                tx,
                input_index,
                &inner_template,
                &inner_subscript,
                hash_type,
                keys,
                false,
            )?;
            match solved {
                Some(mut script) => {
                    script.append_push_data(redeem.to_bytes())?;
                    Ok(Some(script))
                }
                None => Ok(None),
            }
        }

        ScriptTemplate::Opaque => Ok(None),
    }
}

/// Sign the input's digest with one key: DER signature with the hash
/// type byte appended.
fn sign_one(
    tx: &Transaction,
    input_index: usize,
    subscript: &Script,
    hash_type: u32,
    key: &PrivateKey,
) -> Result<Vec<u8>, TransactionError> {
    let digest = sighash::signature_hash(tx, input_index, subscript, hash_type)?;
    let signature = key.sign(&digest)?;
    let der = signature.to_der();
    let mut out = Vec::with_capacity(der.len() + 1);
    out.extend_from_slice(&der);
    out.push(hash_type as u8);
    Ok(out)
}
