//! Script execution thread - the core interpreter engine.

use crate::opcodes::*;
use crate::Script;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::ops_crypto::HashKind;
use super::parsed_opcode::*;
use super::scriptnum::ScriptNumber;
use super::stack::{BoolStack, Stack};
use super::{
    TxContext, MAX_OPS, MAX_SCRIPT_ELEMENT_SIZE, MAX_SCRIPT_NUMBER_LENGTH, MAX_SCRIPT_SIZE,
    MAX_STACK_SIZE,
};

/// Conditional execution constants.
pub(crate) const OP_COND_FALSE: i32 = 0;
pub(crate) const OP_COND_TRUE: i32 = 1;
pub(crate) const OP_COND_SKIP: i32 = 2;

/// The execution thread for the script interpreter.
pub struct Thread<'a> {
    /// The main data stack used during script execution.
    pub dstack: Stack,
    /// The alternate stack used by OP_TOALTSTACK and OP_FROMALTSTACK.
    pub astack: Stack,
    /// Stack tracking whether an OP_ELSE was already seen per nesting level.
    pub else_stack: BoolStack,
    /// The parsed scripts to execute (unlocking, locking, and for P2SH the redeem script).
    pub scripts: Vec<ParsedScript>,
    /// Stack of conditional execution flags for nested IF/ELSE blocks.
    pub cond_stack: Vec<i32>,
    /// Saved copy of the data stack after the unlocking script, for P2SH.
    pub saved_first_stack: Vec<Vec<u8>>,
    /// Index of the currently executing script in the scripts array.
    pub script_idx: usize,
    /// Offset of the currently executing opcode within the current script.
    pub script_off: usize,
    /// Offset of the most recent OP_CODESEPARATOR in the current script.
    pub last_code_sep: usize,
    /// Running count of non-push opcodes executed (checked against MAX_OPS).
    pub num_ops: usize,
    /// Whether the locking script is P2SH and the redeem phase applies.
    pub p2sh: bool,
    /// Optional transaction context for signature verification.
    pub tx_context: Option<&'a dyn TxContext>,
    /// The transaction input index being verified.
    pub input_idx: usize,
}

impl<'a> Thread<'a> {
    /// Create a new execution thread from unlocking and locking scripts.
    ///
    /// Validates script sizes, enforces that the unlocking script is
    /// push-only, parses both scripts, and detects P2SH evaluation.
    pub fn new(
        unlocking_script: &Script,
        locking_script: &Script,
        tx_context: Option<&'a dyn TxContext>,
        input_idx: usize,
    ) -> Result<Self, InterpreterError> {
        if unlocking_script.len() > MAX_SCRIPT_SIZE {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ScriptTooBig,
                format!(
                    "unlocking script size {} is larger than the max allowed size {}",
                    unlocking_script.len(),
                    MAX_SCRIPT_SIZE
                ),
            ));
        }
        if locking_script.len() > MAX_SCRIPT_SIZE {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ScriptTooBig,
                format!(
                    "locking script size {} is larger than the max allowed size {}",
                    locking_script.len(),
                    MAX_SCRIPT_SIZE
                ),
            ));
        }

        // Empty scripts = eval false
        if unlocking_script.is_empty() && locking_script.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution".to_string(),
            ));
        }

        let error_on_checksig = tx_context.is_none();

        let uscript = parse_script(unlocking_script, error_on_checksig)?;
        let lscript = parse_script(locking_script, error_on_checksig)?;

        // The unlocking script may only push data.
        if !is_push_only(&uscript) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "signature script is not push only".to_string(),
            ));
        }

        let p2sh = locking_script.is_p2sh();

        let scripts = vec![uscript, lscript];
        let mut script_idx = 0;

        // Skip empty unlocking script
        if unlocking_script.is_empty() {
            script_idx = 1;
        }

        Ok(Thread {
            dstack: Stack::new(MAX_SCRIPT_NUMBER_LENGTH),
            astack: Stack::new(MAX_SCRIPT_NUMBER_LENGTH),
            else_stack: BoolStack::new(),
            scripts,
            cond_stack: Vec::new(),
            saved_first_stack: Vec::new(),
            script_idx,
            script_off: 0,
            last_code_sep: 0,
            num_ops: 0,
            p2sh,
            tx_context,
            input_idx,
        })
    }

    /// Return true if the current conditional branch is executing.
    pub fn is_branch_executing(&self) -> bool {
        self.cond_stack.is_empty() || *self.cond_stack.last().unwrap() == OP_COND_TRUE
    }

    /// Execute all scripts to completion.
    pub fn execute(&mut self) -> Result<(), InterpreterError> {
        loop {
            let done = self.step()?;
            if done {
                break;
            }
        }
        self.check_error_condition()
    }

    /// Execute one step. Returns true if execution is complete.
    pub fn step(&mut self) -> Result<bool, InterpreterError> {
        // Valid PC check
        if self.script_idx >= self.scripts.len()
            || self.script_off >= self.scripts[self.script_idx].len()
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidProgramCounter,
                format!(
                    "past input scripts {}:{} of {}",
                    self.script_idx,
                    self.script_off,
                    self.scripts.len()
                ),
            ));
        }

        let opcode = self.scripts[self.script_idx][self.script_off].clone();
        self.execute_opcode(&opcode)?;
        self.script_off += 1;

        // Stack size check
        let combined = self.dstack.depth() + self.astack.depth();
        if combined > MAX_STACK_SIZE as i32 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::StackOverflow,
                format!(
                    "combined stack size {} > max allowed {}",
                    combined, MAX_STACK_SIZE
                ),
            ));
        }

        if self.script_off < self.scripts[self.script_idx].len() {
            return Ok(false);
        }

        // End of script - conditionals must be balanced
        if !self.cond_stack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "end of script reached in conditional execution".to_string(),
            ));
        }

        // Alt stack doesn't persist between scripts
        self.astack.clear();

        // Move to next script
        self.num_ops = 0;
        self.script_off = 0;
        self.script_idx += 1;

        // P2SH: after the unlocking script, remember the stack; after the
        // outer locking script passes, re-parse the last pushed item as
        // the redeem script and run it against the remaining stack.
        if self.p2sh && self.script_idx <= 2 {
            match self.script_idx {
                1 => {
                    self.saved_first_stack = self.dstack.get_stack();
                }
                2 => {
                    self.check_error_condition()?;
                    let scr_bytes = self.saved_first_stack.last().cloned().unwrap_or_default();
                    let scr = Script::from_bytes(&scr_bytes);
                    let pops = parse_script(&scr, self.tx_context.is_none())?;
                    self.scripts.push(pops);
                    let len = self.saved_first_stack.len();
                    let new_stack = self.saved_first_stack[..len.saturating_sub(1)].to_vec();
                    self.dstack.set_stack(new_stack);
                }
                _ => {}
            }
        }

        // Skip zero-length scripts
        if self.script_idx < self.scripts.len()
            && self.script_off >= self.scripts[self.script_idx].len()
        {
            self.script_idx += 1;
        }

        self.last_code_sep = 0;
        Ok(self.script_idx >= self.scripts.len())
    }

    /// Final acceptance check: a non-empty stack with a true top item.
    fn check_error_condition(&mut self) -> Result<(), InterpreterError> {
        if self.dstack.depth() < 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EmptyStack,
                "stack empty at end of script execution".to_string(),
            ));
        }

        let v = self.dstack.pop_bool()?;
        if !v {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution".to_string(),
            ));
        }

        Ok(())
    }

    fn execute_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        // Element size check
        if pop.data.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!(
                    "element size {} exceeds max allowed size {}",
                    pop.data.len(),
                    MAX_SCRIPT_ELEMENT_SIZE
                ),
            ));
        }

        // Disabled opcodes fail the script even in unexecuted branches.
        if pop.is_disabled() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DisabledOpcode,
                format!("attempt to execute disabled opcode {}", pop.name()),
            ));
        }

        // Always-illegal opcodes
        if pop.always_illegal() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ReservedOpcode,
                format!("attempt to execute reserved opcode {}", pop.name()),
            ));
        }

        // Count non-push operations
        if pop.opcode > OP_16 {
            self.num_ops += 1;
            if self.num_ops > MAX_OPS {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::TooManyOperations,
                    format!("exceeded max operation limit of {}", MAX_OPS),
                ));
            }
        }

        // Not executing and not conditional => skip
        if !self.is_branch_executing() && !pop.is_conditional() {
            return Ok(());
        }

        self.dispatch_opcode(pop)
    }

    fn dispatch_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        match pop.opcode {
            OP_0 => {
                self.dstack.push_byte_array(vec![]);
                Ok(())
            }
            op if (0x01..=0x4b).contains(&op) => {
                self.dstack.push_byte_array(pop.data.clone());
                Ok(())
            }
            OP_PUSHDATA1 | OP_PUSHDATA2 | OP_PUSHDATA4 => {
                self.dstack.push_byte_array(pop.data.clone());
                Ok(())
            }
            OP_1NEGATE => {
                self.dstack.push_int(&ScriptNumber::new(-1));
                Ok(())
            }
            OP_RESERVED | OP_VER => self.op_reserved(pop),
            op if (OP_1..=OP_16).contains(&op) => {
                self.dstack.push_byte_array(vec![op - (OP_1 - 1)]);
                Ok(())
            }
            OP_NOP => Ok(()),
            OP_IF => self.op_if(),
            OP_NOTIF => self.op_notif(),
            OP_ELSE => self.op_else(pop),
            OP_ENDIF => self.op_endif(pop),
            OP_VERIFY => self.op_verify(pop),
            OP_RETURN => self.op_return(),

            // Stack ops
            OP_TOALTSTACK => self.op_to_alt_stack(),
            OP_FROMALTSTACK => self.op_from_alt_stack(),
            OP_2DROP => self.dstack.drop_n(2),
            OP_2DUP => self.dstack.dup_n(2),
            OP_3DUP => self.dstack.dup_n(3),
            OP_2OVER => self.dstack.over_n(2),
            OP_2ROT => self.dstack.rot_n(2),
            OP_2SWAP => self.dstack.swap_n(2),
            OP_IFDUP => self.op_ifdup(),
            OP_DEPTH => {
                let d = self.dstack.depth();
                self.dstack.push_int(&ScriptNumber::new(d as i64));
                Ok(())
            }
            OP_DROP => self.dstack.drop_n(1),
            OP_DUP => self.dstack.dup_n(1),
            OP_NIP => self.dstack.nip_n_discard(1),
            OP_OVER => self.dstack.over_n(1),
            OP_PICK => self.op_pick(),
            OP_ROLL => self.op_roll(),
            OP_ROT => self.dstack.rot_n(1),
            OP_SWAP => self.dstack.swap_n(1),
            OP_TUCK => self.dstack.tuck(),

            OP_SIZE => self.op_size(),
            OP_EQUAL => self.op_equal(),
            OP_EQUALVERIFY => self.op_equalverify(pop),
            OP_RESERVED1 | OP_RESERVED2 => self.op_reserved(pop),

            // Arithmetic
            OP_1ADD => self.op_unary_int(|m| {
                m.incr();
            }),
            OP_1SUB => self.op_unary_int(|m| {
                m.decr();
            }),
            OP_NEGATE => self.op_unary_int(|m| {
                m.neg();
            }),
            OP_ABS => self.op_unary_int(|m| {
                m.abs();
            }),
            OP_NOT => self.op_not(),
            OP_0NOTEQUAL => self.op_0notequal(),
            OP_ADD => self.op_add(),
            OP_SUB => self.op_sub(),
            OP_BOOLAND => self.op_bool_binop(|a, b| !a.is_zero() && !b.is_zero()),
            OP_BOOLOR => self.op_bool_binop(|a, b| !a.is_zero() || !b.is_zero()),
            OP_NUMEQUAL => self.op_bool_binop(|a, b| a.equal(b)),
            OP_NUMEQUALVERIFY => self.op_numequalverify(pop),
            OP_NUMNOTEQUAL => self.op_bool_binop(|a, b| !a.equal(b)),
            OP_LESSTHAN => self.op_bool_binop(|a, b| a.less_than(b)),
            OP_GREATERTHAN => self.op_bool_binop(|a, b| a.greater_than(b)),
            OP_LESSTHANOREQUAL => self.op_bool_binop(|a, b| a.less_than_or_equal(b)),
            OP_GREATERTHANOREQUAL => self.op_bool_binop(|a, b| a.greater_than_or_equal(b)),
            OP_MIN => self.op_min(),
            OP_MAX => self.op_max(),
            OP_WITHIN => self.op_within(),

            // Crypto
            OP_RIPEMD160 => self.op_hash(HashKind::Ripemd160),
            OP_SHA1 => self.op_hash(HashKind::Sha1),
            OP_SHA256 => self.op_hash(HashKind::Sha256),
            OP_HASH160 => self.op_hash(HashKind::Hash160),
            OP_HASH256 => self.op_hash(HashKind::Hash256),
            OP_CODESEPARATOR => {
                self.last_code_sep = self.script_off;
                Ok(())
            }
            OP_CHECKSIG => self.op_checksig(),
            OP_CHECKSIGVERIFY => self.op_checksigverify(pop),
            OP_CHECKMULTISIG => self.op_checkmultisig(),
            OP_CHECKMULTISIGVERIFY => self.op_checkmultisigverify(pop),

            // Upgradable NOP opcodes (OP_NOP2/OP_NOP3 included; no
            // soft-fork semantics are interpreted here)
            OP_NOP1 | OP_NOP2 | OP_NOP3 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8
            | OP_NOP9 | OP_NOP10 => Ok(()),

            // All unknown/invalid opcodes
            _ => Err(InterpreterError::new(
                InterpreterErrorCode::ReservedOpcode,
                format!("attempt to execute invalid opcode {}", pop.name()),
            )),
        }
    }
}
