//! Flow control operations for the script interpreter.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::parsed_opcode::ParsedOpcode;
use super::thread::{Thread, OP_COND_FALSE, OP_COND_SKIP, OP_COND_TRUE};

impl<'a> Thread<'a> {
    pub(crate) fn op_reserved(&self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        Err(InterpreterError::new(
            InterpreterErrorCode::ReservedOpcode,
            format!("attempt to execute reserved opcode {}", pop.name()),
        ))
    }

    pub(crate) fn op_if(&mut self) -> Result<(), InterpreterError> {
        let mut cond_val = OP_COND_FALSE;
        if self.is_branch_executing() {
            let ok = self.dstack.pop_bool()?;
            if ok {
                cond_val = OP_COND_TRUE;
            }
        } else {
            cond_val = OP_COND_SKIP;
        }
        self.cond_stack.push(cond_val);
        self.else_stack.push_bool(false);
        Ok(())
    }

    pub(crate) fn op_notif(&mut self) -> Result<(), InterpreterError> {
        let mut cond_val = OP_COND_FALSE;
        if self.is_branch_executing() {
            let ok = self.dstack.pop_bool()?;
            if !ok {
                cond_val = OP_COND_TRUE;
            }
        } else {
            cond_val = OP_COND_SKIP;
        }
        self.cond_stack.push(cond_val);
        self.else_stack.push_bool(false);
        Ok(())
    }

    pub(crate) fn op_else(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if self.cond_stack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                format!(
                    "encountered opcode {} with no matching opcode to begin conditional execution",
                    pop.name()
                ),
            ));
        }

        // A second OP_ELSE at the same nesting level is unbalanced.
        let seen = self.else_stack.pop_bool()?;
        if seen {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                format!(
                    "encountered opcode {} after an OP_ELSE at the same level",
                    pop.name()
                ),
            ));
        }

        let idx = self.cond_stack.len() - 1;
        match self.cond_stack[idx] {
            OP_COND_TRUE => self.cond_stack[idx] = OP_COND_FALSE,
            OP_COND_FALSE => self.cond_stack[idx] = OP_COND_TRUE,
            _ => {} // OP_COND_SKIP stays
        }

        self.else_stack.push_bool(true);
        Ok(())
    }

    pub(crate) fn op_endif(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if self.cond_stack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                format!(
                    "encountered opcode {} with no matching opcode to begin conditional execution",
                    pop.name()
                ),
            ));
        }
        self.cond_stack.pop();
        self.else_stack.pop_bool()?;
        Ok(())
    }

    pub(crate) fn op_verify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.abstract_verify(pop, InterpreterErrorCode::Verify)
    }

    pub(crate) fn abstract_verify(
        &mut self,
        pop: &ParsedOpcode,
        code: InterpreterErrorCode,
    ) -> Result<(), InterpreterError> {
        let verified = self.dstack.pop_bool()?;
        if !verified {
            return Err(InterpreterError::new(code, format!("{} failed", pop.name())));
        }
        Ok(())
    }

    pub(crate) fn op_return(&mut self) -> Result<(), InterpreterError> {
        Err(InterpreterError::new(
            InterpreterErrorCode::EarlyReturn,
            "script returned early".to_string(),
        ))
    }
}
