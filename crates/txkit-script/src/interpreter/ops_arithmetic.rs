//! Arithmetic operations for the script interpreter.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::ScriptNumber;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_unary_int(
        &mut self,
        f: impl FnOnce(&mut ScriptNumber),
    ) -> Result<(), InterpreterError> {
        let mut m = self.dstack.pop_int()?;
        f(&mut m);
        self.dstack.push_int(&m);
        Ok(())
    }

    pub(crate) fn op_not(&mut self) -> Result<(), InterpreterError> {
        let m = self.dstack.pop_int()?;
        let n = if m.is_zero() { 1i64 } else { 0 };
        self.dstack.push_int(&ScriptNumber::new(n));
        Ok(())
    }

    pub(crate) fn op_0notequal(&mut self) -> Result<(), InterpreterError> {
        let mut m = self.dstack.pop_int()?;
        if !m.is_zero() {
            m.set(1);
        }
        self.dstack.push_int(&m);
        Ok(())
    }

    pub(crate) fn op_add(&mut self) -> Result<(), InterpreterError> {
        let mut v0 = self.dstack.pop_int()?;
        let v1 = self.dstack.pop_int()?;
        v0.add(&v1);
        self.dstack.push_int(&v0);
        Ok(())
    }

    pub(crate) fn op_sub(&mut self) -> Result<(), InterpreterError> {
        let v0 = self.dstack.pop_int()?;
        let mut v1 = self.dstack.pop_int()?;
        v1.sub(&v0);
        self.dstack.push_int(&v1);
        Ok(())
    }

    pub(crate) fn op_bool_binop(
        &mut self,
        f: impl FnOnce(&ScriptNumber, &ScriptNumber) -> bool,
    ) -> Result<(), InterpreterError> {
        let v0 = self.dstack.pop_int()?;
        let v1 = self.dstack.pop_int()?;
        let n = if f(&v1, &v0) { 1i64 } else { 0 };
        self.dstack.push_int(&ScriptNumber::new(n));
        Ok(())
    }

    pub(crate) fn op_numequalverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_bool_binop(|a, b| a.equal(b))?;
        self.abstract_verify(pop, InterpreterErrorCode::NumEqualVerify)
    }

    pub(crate) fn op_min(&mut self) -> Result<(), InterpreterError> {
        let v0 = self.dstack.pop_int()?;
        let v1 = self.dstack.pop_int()?;
        if v1.less_than(&v0) {
            self.dstack.push_int(&v1);
        } else {
            self.dstack.push_int(&v0);
        }
        Ok(())
    }

    pub(crate) fn op_max(&mut self) -> Result<(), InterpreterError> {
        let v0 = self.dstack.pop_int()?;
        let v1 = self.dstack.pop_int()?;
        if v1.greater_than(&v0) {
            self.dstack.push_int(&v1);
        } else {
            self.dstack.push_int(&v0);
        }
        Ok(())
    }

    pub(crate) fn op_within(&mut self) -> Result<(), InterpreterError> {
        let max_val = self.dstack.pop_int()?;
        let min_val = self.dstack.pop_int()?;
        let x = self.dstack.pop_int()?;
        let n = if min_val.less_than_or_equal(&x) && x.less_than(&max_val) {
            1i64
        } else {
            0
        };
        self.dstack.push_int(&ScriptNumber::new(n));
        Ok(())
    }
}
