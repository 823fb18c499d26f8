//! Parsed opcode representation and script parser.

use crate::opcodes::*;
use crate::Script;

use super::error::{InterpreterError, InterpreterErrorCode};

/// A parsed opcode with its data payload.
#[derive(Debug, Clone)]
pub struct ParsedOpcode {
    /// The opcode byte value.
    pub opcode: u8,
    /// The data payload associated with push opcodes (empty otherwise).
    pub data: Vec<u8>,
}

impl ParsedOpcode {
    /// Return the human-readable name of this opcode.
    pub fn name(&self) -> String {
        opcode_to_string(self.opcode)
    }

    /// Return true if this opcode is disabled.
    ///
    /// The disabled set is the one the Satoshi client froze in 2010:
    /// splice, bitwise, and the wide arithmetic opcodes.
    pub fn is_disabled(&self) -> bool {
        matches!(
            self.opcode,
            OP_CAT | OP_SUBSTR | OP_LEFT | OP_RIGHT | OP_INVERT | OP_AND | OP_OR | OP_XOR
                | OP_2MUL | OP_2DIV | OP_MUL | OP_DIV | OP_MOD | OP_LSHIFT | OP_RSHIFT
        )
    }

    /// Return true if this opcode is always illegal (OP_VERIF, OP_VERNOTIF).
    pub fn always_illegal(&self) -> bool {
        matches!(self.opcode, OP_VERIF | OP_VERNOTIF)
    }

    /// Return true if this opcode is a conditional flow control opcode.
    pub fn is_conditional(&self) -> bool {
        matches!(
            self.opcode,
            OP_IF | OP_NOTIF | OP_ELSE | OP_ENDIF | OP_VERIF | OP_VERNOTIF
        )
    }

    /// Return true if this opcode requires a transaction context.
    pub fn requires_tx(&self) -> bool {
        matches!(
            self.opcode,
            OP_CHECKSIG | OP_CHECKSIGVERIFY | OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY
        )
    }

    /// Check if this is a canonical push (the smallest push opcode for
    /// its payload). Used when matching pushed data for removal.
    pub fn canonical_push(&self) -> bool {
        let opcode = self.opcode;
        let data_len = self.data.len();
        if opcode > OP_16 {
            return true;
        }
        if opcode < OP_PUSHDATA1 && opcode > OP_0 && data_len == 1 && self.data[0] <= 16 {
            return false;
        }
        if opcode == OP_PUSHDATA1 && data_len < OP_PUSHDATA1 as usize {
            return false;
        }
        if opcode == OP_PUSHDATA2 && data_len <= 0xff {
            return false;
        }
        if opcode == OP_PUSHDATA4 && data_len <= 0xffff {
            return false;
        }
        true
    }

    /// Serialize back to script bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.opcode];
        match self.opcode {
            OP_PUSHDATA1 => {
                out.push(self.data.len() as u8);
                out.extend_from_slice(&self.data);
            }
            OP_PUSHDATA2 => {
                out.extend_from_slice(&(self.data.len() as u16).to_le_bytes());
                out.extend_from_slice(&self.data);
            }
            OP_PUSHDATA4 => {
                out.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
                out.extend_from_slice(&self.data);
            }
            0x01..=0x4b => {
                out.extend_from_slice(&self.data);
            }
            _ => {}
        }
        out
    }
}

/// A parsed script is a sequence of parsed opcodes.
pub type ParsedScript = Vec<ParsedOpcode>;

/// Check if a parsed script is push-only.
pub fn is_push_only(script: &ParsedScript) -> bool {
    script.iter().all(|op| op.opcode <= OP_16)
}

/// Remove canonical pushes of the given data (legacy FindAndDelete).
pub fn remove_opcode_by_data(script: &ParsedScript, data: &[u8]) -> ParsedScript {
    script
        .iter()
        .filter(|pop| !pop.canonical_push() || !pop.data.windows(data.len()).any(|w| w == data))
        .cloned()
        .collect()
}

/// Remove all occurrences of a specific opcode.
pub fn remove_opcode(script: &ParsedScript, opcode: u8) -> ParsedScript {
    script
        .iter()
        .filter(|pop| pop.opcode != opcode)
        .cloned()
        .collect()
}

/// Unparse a ParsedScript back to a Script.
pub fn unparse(pscript: &ParsedScript) -> Script {
    let mut bytes = Vec::new();
    for pop in pscript {
        bytes.extend_from_slice(&pop.to_bytes());
    }
    Script::from_bytes(&bytes)
}

/// Parse a Script into a ParsedScript.
///
/// `error_on_checksig` - if true, checksig-family opcodes are a parse
/// error (used when no transaction context is available).
pub fn parse_script(
    script: &Script,
    error_on_checksig: bool,
) -> Result<ParsedScript, InterpreterError> {
    let scr = script.to_bytes();
    let mut parsed_ops = Vec::new();
    let mut i = 0;

    while i < scr.len() {
        let instruction = scr[i];
        let mut parsed_op = ParsedOpcode {
            opcode: instruction,
            data: Vec::new(),
        };

        if error_on_checksig && parsed_op.requires_tx() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "tx and previous output must be supplied for checksig".to_string(),
            ));
        }

        match instruction {
            OP_PUSHDATA1 => {
                if i + 1 >= scr.len() {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::MalformedPush,
                        "script truncated".to_string(),
                    ));
                }
                let data_len = scr[i + 1] as usize;
                if i + 2 + data_len > scr.len() {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::MalformedPush,
                        "push data exceeds script length".to_string(),
                    ));
                }
                parsed_op.data = scr[i + 2..i + 2 + data_len].to_vec();
                i += 2 + data_len;
            }
            OP_PUSHDATA2 => {
                if i + 2 >= scr.len() {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::MalformedPush,
                        "script truncated".to_string(),
                    ));
                }
                let data_len = u16::from_le_bytes([scr[i + 1], scr[i + 2]]) as usize;
                if i + 3 + data_len > scr.len() {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::MalformedPush,
                        "push data exceeds script length".to_string(),
                    ));
                }
                parsed_op.data = scr[i + 3..i + 3 + data_len].to_vec();
                i += 3 + data_len;
            }
            OP_PUSHDATA4 => {
                if i + 4 >= scr.len() {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::MalformedPush,
                        "script truncated".to_string(),
                    ));
                }
                let data_len = u32::from_le_bytes([
                    scr[i + 1],
                    scr[i + 2],
                    scr[i + 3],
                    scr[i + 4],
                ]) as usize;
                if i + 5 + data_len > scr.len() {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::MalformedPush,
                        "push data exceeds script length".to_string(),
                    ));
                }
                parsed_op.data = scr[i + 5..i + 5 + data_len].to_vec();
                i += 5 + data_len;
            }
            op if (0x01..=0x4b).contains(&op) => {
                let data_len = op as usize;
                if i + 1 + data_len > scr.len() {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::MalformedPush,
                        "script truncated".to_string(),
                    ));
                }
                parsed_op.data = scr[i + 1..i + 1 + data_len].to_vec();
                i += 1 + data_len;
            }
            _ => {
                i += 1;
            }
        }

        parsed_ops.push(parsed_op);
    }

    Ok(parsed_ops)
}
