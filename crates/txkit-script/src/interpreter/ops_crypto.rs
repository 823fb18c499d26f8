//! Crypto operations for the script interpreter.

use crate::opcodes::OP_CODESEPARATOR;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::parsed_opcode::*;
use super::thread::Thread;
use super::MAX_PUB_KEYS_PER_MULTISIG;

pub(crate) enum HashKind {
    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
}

impl<'a> Thread<'a> {
    pub(crate) fn op_hash(&mut self, kind: HashKind) -> Result<(), InterpreterError> {
        let buf = self.dstack.pop_byte_array()?;
        let result = match kind {
            HashKind::Ripemd160 => {
                use ripemd::{Digest, Ripemd160};
                Ripemd160::digest(&buf).to_vec()
            }
            HashKind::Sha1 => {
                use sha1::{Digest, Sha1};
                Sha1::digest(&buf).to_vec()
            }
            HashKind::Sha256 => {
                use sha2::{Digest, Sha256};
                Sha256::digest(&buf).to_vec()
            }
            HashKind::Hash160 => {
                use ripemd::Ripemd160;
                use sha2::{Digest, Sha256};
                let sha = Sha256::digest(&buf);
                Ripemd160::digest(sha).to_vec()
            }
            HashKind::Hash256 => {
                use sha2::{Digest, Sha256};
                Sha256::digest(Sha256::digest(&buf)).to_vec()
            }
        };
        self.dstack.push_byte_array(result);
        Ok(())
    }

    /// The portion of the executing script since the most recent
    /// OP_CODESEPARATOR.
    pub(crate) fn sub_script(&self) -> ParsedScript {
        let skip = if self.last_code_sep > 0 {
            self.last_code_sep + 1
        } else {
            0
        };
        self.scripts[self.script_idx][skip..].to_vec()
    }

    pub(crate) fn op_checksig(&mut self) -> Result<(), InterpreterError> {
        let pk_bytes = self.dstack.pop_byte_array()?;
        let full_sig_bytes = self.dstack.pop_byte_array()?;

        if full_sig_bytes.is_empty() {
            self.dstack.push_bool(false);
            return Ok(());
        }

        let ctx = self.tx_context.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "no tx context for checksig".to_string(),
            )
        })?;

        // Subscript: since the last code separator, with the signature
        // itself and any remaining separators removed (legacy rules).
        let mut sub_script = self.sub_script();
        sub_script = remove_opcode_by_data(&sub_script, &full_sig_bytes);
        sub_script = remove_opcode(&sub_script, OP_CODESEPARATOR);
        let script_bytes = unparse(&sub_script);

        match ctx.verify_signature(&full_sig_bytes, &pk_bytes, &script_bytes, self.input_idx) {
            Ok(valid) => {
                self.dstack.push_bool(valid);
                Ok(())
            }
            Err(_) => {
                self.dstack.push_bool(false);
                Ok(())
            }
        }
    }

    pub(crate) fn op_checksigverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_checksig()?;
        self.abstract_verify(pop, InterpreterErrorCode::CheckSigVerify)
    }

    pub(crate) fn op_checkmultisig(&mut self) -> Result<(), InterpreterError> {
        let num_keys = self.dstack.pop_int()?;
        let num_pub_keys = num_keys.to_int() as i32;

        if num_pub_keys < 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidPubKeyCount,
                format!("number of pubkeys {} is negative", num_pub_keys),
            ));
        }
        if num_pub_keys as usize > MAX_PUB_KEYS_PER_MULTISIG {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidPubKeyCount,
                format!(
                    "too many pubkeys: {} > {}",
                    num_pub_keys, MAX_PUB_KEYS_PER_MULTISIG
                ),
            ));
        }

        self.num_ops += num_pub_keys as usize;
        if self.num_ops > super::MAX_OPS {
            return Err(InterpreterError::new(
                InterpreterErrorCode::TooManyOperations,
                format!("exceeded max operation limit of {}", super::MAX_OPS),
            ));
        }

        let mut pub_keys = Vec::new();
        for _ in 0..num_pub_keys {
            pub_keys.push(self.dstack.pop_byte_array()?);
        }

        let num_sigs = self.dstack.pop_int()?;
        let num_signatures = num_sigs.to_int() as i32;

        if num_signatures < 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSignatureCount,
                format!("number of signatures {} is negative", num_signatures),
            ));
        }
        if num_signatures > num_pub_keys {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSignatureCount,
                format!(
                    "more signatures than pubkeys: {} > {}",
                    num_signatures, num_pub_keys
                ),
            ));
        }

        let mut signatures: Vec<Vec<u8>> = Vec::new();
        for _ in 0..num_signatures {
            signatures.push(self.dstack.pop_byte_array()?);
        }

        // The historical off-by-one: an extra item is popped and ignored.
        let _dummy = self.dstack.pop_byte_array()?;

        // Subscript with all signatures and code separators removed.
        let mut scr = self.sub_script();
        for sig in &signatures {
            scr = remove_opcode_by_data(&scr, sig);
        }
        scr = remove_opcode(&scr, OP_CODESEPARATOR);

        let ctx = match self.tx_context {
            Some(c) => c,
            None => {
                self.dstack.push_bool(false);
                return Ok(());
            }
        };

        let script_bytes = unparse(&scr);

        // Signatures must match keys in order; keys may be skipped.
        let mut success = true;
        let mut remaining_keys = num_pub_keys + 1;
        let mut pub_key_idx: i32 = -1;
        let mut sig_idx: usize = 0;
        let mut remaining_sigs = num_signatures;

        while remaining_sigs > 0 {
            pub_key_idx += 1;
            remaining_keys -= 1;

            if remaining_sigs > remaining_keys {
                success = false;
                break;
            }

            let sig = &signatures[sig_idx];
            let pub_key = &pub_keys[pub_key_idx as usize];

            if sig.is_empty() {
                continue;
            }

            if let Ok(true) =
                ctx.verify_signature(sig, pub_key, &script_bytes, self.input_idx)
            {
                sig_idx += 1;
                remaining_sigs -= 1;
            }
        }

        self.dstack.push_bool(success);
        Ok(())
    }

    pub(crate) fn op_checkmultisigverify(
        &mut self,
        pop: &ParsedOpcode,
    ) -> Result<(), InterpreterError> {
        self.op_checkmultisig()?;
        self.abstract_verify(pop, InterpreterErrorCode::CheckMultiSigVerify)
    }
}
