//! Standard script template classification and construction.
//!
//! A previous output's locking script is classified into one of the
//! standard templates; the solver and the human-readable summary both
//! dispatch on the resulting variant. Adding a template means adding a
//! variant plus the match arms that consume it.

use crate::address::{Address, AddressKind, Network};
use crate::chunk::ScriptChunk;
use crate::opcodes::*;
use crate::{Script, ScriptError};

/// A classified locking script with its extracted parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptTemplate {
    /// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
    P2pkh {
        /// The 20-byte public key hash the output is locked to.
        hash160: [u8; 20],
    },
    /// `<pubkey> OP_CHECKSIG`
    P2pk {
        /// The embedded 33- or 65-byte public key.
        pub_key: Vec<u8>,
    },
    /// `<m> <pk1>..<pkn> <n> OP_CHECKMULTISIG` with `1 <= m <= n <= 16`
    Multisig {
        /// Number of signatures required.
        required: usize,
        /// The public keys, in script order.
        pub_keys: Vec<Vec<u8>>,
    },
    /// `OP_HASH160 <hash> OP_EQUAL`
    P2sh {
        /// The 20-byte hash of the redeem script.
        hash160: [u8; 20],
    },
    /// Anything else, including unparseable scripts.
    Opaque,
}

impl ScriptTemplate {
    /// Classify a locking script into a standard template.
    ///
    /// # Arguments
    /// * `script` - The locking script to classify.
    ///
    /// # Returns
    /// The matching template variant, or `Opaque`.
    pub fn classify(script: &Script) -> ScriptTemplate {
        if script.is_p2pkh() {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(&script.to_bytes()[3..23]);
            return ScriptTemplate::P2pkh { hash160: hash };
        }
        if script.is_p2sh() {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(&script.to_bytes()[2..22]);
            return ScriptTemplate::P2sh { hash160: hash };
        }

        let chunks = match script.chunks() {
            Ok(chunks) => chunks,
            Err(_) => return ScriptTemplate::Opaque,
        };

        if let Some(pub_key) = match_p2pk(&chunks) {
            return ScriptTemplate::P2pk { pub_key };
        }
        if let Some((required, pub_keys)) = match_multisig(&chunks) {
            return ScriptTemplate::Multisig { required, pub_keys };
        }

        ScriptTemplate::Opaque
    }

    /// The address form of this template, when it has one.
    ///
    /// P2PKH and P2SH map directly to base58check addresses; P2PK maps
    /// to the address of the embedded key's hash. Multisig and opaque
    /// scripts have no single address.
    ///
    /// # Arguments
    /// * `network` - The network for the address version byte.
    ///
    /// # Returns
    /// `Some(Address)` where one exists.
    pub fn address(&self, network: Network) -> Option<Address> {
        match self {
            ScriptTemplate::P2pkh { hash160 } => {
                Some(Address::from_public_key_hash(hash160, network))
            }
            ScriptTemplate::P2pk { pub_key } => {
                let hash = txkit_primitives::hash::hash160(pub_key);
                Some(Address::from_public_key_hash(&hash, network))
            }
            ScriptTemplate::P2sh { hash160 } => {
                Some(Address::from_script_hash(hash160, network))
            }
            ScriptTemplate::Multisig { .. } | ScriptTemplate::Opaque => None,
        }
    }
}

/// Match `<pubkey> OP_CHECKSIG` with a plausible key encoding.
fn match_p2pk(chunks: &[ScriptChunk]) -> Option<Vec<u8>> {
    if chunks.len() != 2 || chunks[1].op != OP_CHECKSIG {
        return None;
    }
    let pub_key = chunks[0].data.as_ref()?;
    if is_plausible_pub_key(pub_key) {
        Some(pub_key.clone())
    } else {
        None
    }
}

/// Match `<m> <pk1>..<pkn> <n> OP_CHECKMULTISIG` with `1 <= m <= n <= 16`.
fn match_multisig(chunks: &[ScriptChunk]) -> Option<(usize, Vec<Vec<u8>>)> {
    if chunks.len() < 4 {
        return None;
    }
    let last = &chunks[chunks.len() - 1];
    if last.op != OP_CHECKMULTISIG {
        return None;
    }

    let m = small_int_value(chunks[0].op)? as usize;
    let n = small_int_value(chunks[chunks.len() - 2].op)? as usize;

    let key_chunks = &chunks[1..chunks.len() - 2];
    if m < 1 || m > n || n > 16 || key_chunks.len() != n {
        return None;
    }

    let mut pub_keys = Vec::with_capacity(n);
    for chunk in key_chunks {
        let key = chunk.data.as_ref()?;
        if !is_plausible_pub_key(key) {
            return None;
        }
        pub_keys.push(key.clone());
    }
    Some((m, pub_keys))
}

/// A 33-byte key with an 0x02/0x03 prefix or a 65-byte key with 0x04.
fn is_plausible_pub_key(bytes: &[u8]) -> bool {
    match bytes.first() {
        Some(0x02) | Some(0x03) => bytes.len() == 33,
        Some(0x04) => bytes.len() == 65,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Locking script builders
// ---------------------------------------------------------------------------

/// Create a P2PKH locking script from a 20-byte public key hash.
///
/// Produces: `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
///
/// # Arguments
/// * `hash` - The public key hash to lock to.
///
/// # Returns
/// The 25-byte P2PKH locking script.
pub fn p2pkh_lock(hash: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(25);
    bytes.push(OP_DUP);
    bytes.push(OP_HASH160);
    bytes.push(OP_DATA_20);
    bytes.extend_from_slice(hash);
    bytes.push(OP_EQUALVERIFY);
    bytes.push(OP_CHECKSIG);
    Script::from_bytes(&bytes)
}

/// Create a P2PK locking script from public key bytes.
///
/// Produces: `<pubkey> OP_CHECKSIG`
///
/// # Arguments
/// * `pub_key` - The 33- or 65-byte public key.
///
/// # Returns
/// The P2PK locking script, or an error for an implausible key.
pub fn p2pk_lock(pub_key: &[u8]) -> Result<Script, ScriptError> {
    if !is_plausible_pub_key(pub_key) {
        return Err(ScriptError::InvalidScript(format!(
            "implausible public key of {} bytes",
            pub_key.len()
        )));
    }
    let mut script = Script::new();
    script.append_push_data(pub_key)?;
    script.append_opcodes(&[OP_CHECKSIG])?;
    Ok(script)
}

/// Create a P2SH locking script from a 20-byte script hash.
///
/// Produces: `OP_HASH160 <hash> OP_EQUAL`
///
/// # Arguments
/// * `hash` - The hash160 of the redeem script.
///
/// # Returns
/// The 23-byte P2SH locking script.
pub fn p2sh_lock(hash: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(23);
    bytes.push(OP_HASH160);
    bytes.push(OP_DATA_20);
    bytes.extend_from_slice(hash);
    bytes.push(OP_EQUAL);
    Script::from_bytes(&bytes)
}

/// Create an m-of-n multisig locking script.
///
/// Produces: `<m> <pk1>..<pkn> <n> OP_CHECKMULTISIG`
///
/// # Arguments
/// * `required` - Signatures required (m).
/// * `pub_keys` - The public keys in order (n of them).
///
/// # Returns
/// The multisig locking script, or an error for out-of-range m/n or an
/// implausible key.
pub fn multisig_lock(required: usize, pub_keys: &[Vec<u8>]) -> Result<Script, ScriptError> {
    let n = pub_keys.len();
    if required < 1 || required > n || n > 16 {
        return Err(ScriptError::InvalidScript(format!(
            "multisig {}-of-{} out of range",
            required, n
        )));
    }
    let mut script = Script::new();
    script.append_opcodes(&[OP_1 + required as u8 - 1])?;
    for key in pub_keys {
        if !is_plausible_pub_key(key) {
            return Err(ScriptError::InvalidScript(format!(
                "implausible public key of {} bytes",
                key.len()
            )));
        }
        script.append_push_data(key)?;
    }
    script.append_opcodes(&[OP_1 + n as u8 - 1, OP_CHECKMULTISIG])?;
    Ok(script)
}

/// Create the locking script paying to an address.
///
/// P2PKH addresses get a P2PKH script; P2SH addresses get a P2SH script.
///
/// # Arguments
/// * `address` - The destination address.
///
/// # Returns
/// The locking script for the address.
pub fn lock_for_address(address: &Address) -> Script {
    match address.kind {
        AddressKind::PubKeyHash => p2pkh_lock(&address.hash160),
        AddressKind::ScriptHash => p2sh_lock(&address.hash160),
    }
}
