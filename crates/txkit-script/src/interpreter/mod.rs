//! Bitcoin script interpreter.
//!
//! Executes unlocking and locking scripts under legacy Bitcoin rules to
//! decide whether an input is authorized to spend its previous output,
//! including BIP16 (P2SH) redeem-script evaluation.
//!
//! # Architecture
//!
//! The interpreter does not depend on the transaction crate directly to
//! avoid circular dependencies. Instead, callers provide a [`TxContext`]
//! trait implementation that performs signature hash computation and
//! signature verification for OP_CHECKSIG and OP_CHECKMULTISIG.

pub mod error;
pub mod parsed_opcode;
pub mod scriptnum;
pub mod stack;
pub mod thread;

mod ops_arithmetic;
mod ops_crypto;
mod ops_data;
mod ops_flow;
mod ops_stack;

pub use error::{InterpreterError, InterpreterErrorCode};
pub use parsed_opcode::{ParsedOpcode, ParsedScript};
pub use scriptnum::ScriptNumber;
pub use stack::Stack;

use crate::Script;
use thread::Thread;

/// Maximum non-push operations per script.
pub const MAX_OPS: usize = 500;
/// Maximum combined size of the data and alt stacks.
pub const MAX_STACK_SIZE: usize = 1000;
/// Maximum script size in bytes.
pub const MAX_SCRIPT_SIZE: usize = 10000;
/// Maximum size of a single pushed element.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
/// Maximum byte length of a numeric operand.
pub const MAX_SCRIPT_NUMBER_LENGTH: usize = 4;
/// Maximum public keys in an OP_CHECKMULTISIG.
pub const MAX_PUB_KEYS_PER_MULTISIG: usize = 20;

/// Transaction context trait - provides signature verification without a
/// circular dependency on the transaction crate.
///
/// Implementors compute the signature hash for the given input under
/// `sub_script` (using the hash-type byte trailing `full_sig`) and check
/// the ECDSA signature against `pub_key`.
pub trait TxContext {
    /// Verify a signature against a public key for the given input.
    ///
    /// `full_sig` is the DER signature with the sighash flag byte at the
    /// end. `sub_script` is the relevant portion of the executing script.
    ///
    /// Returns Ok(true) if valid, Ok(false) if invalid, Err on failure
    /// to even attempt verification (treated as invalid by the caller).
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_idx: usize,
    ) -> Result<bool, InterpreterError>;
}

/// The script execution engine.
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Engine
    }

    /// Execute unlocking + locking scripts for one input.
    ///
    /// # Arguments
    /// * `unlocking_script` - The input's unlocking (signature) script.
    /// * `locking_script` - The previous output's locking script.
    /// * `tx_context` - Transaction context for checksig operations, when
    ///   available.
    /// * `input_idx` - The input index being verified.
    ///
    /// # Returns
    /// `Ok(())` when the input validates, an `InterpreterError` otherwise.
    pub fn execute(
        &self,
        unlocking_script: &Script,
        locking_script: &Script,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
    ) -> Result<(), InterpreterError> {
        let mut thread = Thread::new(unlocking_script, locking_script, tx_context, input_idx)?;
        thread.execute()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
