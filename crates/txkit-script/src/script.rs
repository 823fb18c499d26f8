/// Bitcoin Script type - a sequence of opcodes and data pushes.
///
/// Scripts are used in transaction inputs (unlocking) and outputs
/// (locking) to define spending conditions. The Script wraps a `Vec<u8>`
/// and provides methods for construction, serialization, and ASM output.
/// An unparseable script still serializes byte-for-byte; it only fails
/// once something tries to interpret it.

use std::fmt;

use crate::chunk::{decode_script, push_data_prefix, ScriptChunk};
use crate::opcodes::*;
use crate::ScriptError;

/// A Bitcoin script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    ///
    /// # Returns
    /// An empty `Script` instance.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is
    /// invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| ScriptError::InvalidHex(e.to_string()))?;
        Ok(Script(bytes))
    }

    /// Create a script from raw bytes.
    ///
    /// # Arguments
    /// * `bytes` - Raw script bytes.
    ///
    /// # Returns
    /// A `Script` wrapping a copy of the given bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Create a script from a Bitcoin ASM string.
    ///
    /// Parses space-separated tokens where known opcodes (e.g. "OP_DUP")
    /// are emitted directly and hex strings are treated as push data.
    ///
    /// # Arguments
    /// * `asm` - A space-separated ASM string.
    ///
    /// # Returns
    /// A `Script`, or an error if any token is invalid.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        if asm.is_empty() {
            return Ok(script);
        }
        for section in asm.split(' ') {
            if let Some(opcode) = string_to_opcode(section) {
                script.append_opcodes(&[opcode])?;
            } else {
                script.append_push_data_hex(section)?;
            }
        }
        Ok(script)
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Encode the script as a hex string.
    ///
    /// # Returns
    /// A lowercase hex representation of the script bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Convert the script to its ASM (human-readable assembly)
    /// representation.
    ///
    /// Each opcode or data push is a space-separated token. Data pushes
    /// appear as their hex encoding; opcodes appear by name. Returns an
    /// empty string for empty or unparseable scripts.
    ///
    /// # Returns
    /// A space-separated ASM string.
    pub fn to_asm(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        match decode_script(&self.0) {
            Ok(chunks) => chunks
                .iter()
                .map(|c| c.to_asm_string())
                .collect::<Vec<_>>()
                .join(" "),
            Err(_) => String::new(),
        }
    }

    /// Return a reference to the underlying bytes.
    ///
    /// # Returns
    /// A byte slice of the script contents.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return the length of the script in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the script is empty (zero bytes).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the script into a vector of decoded chunks.
    ///
    /// # Returns
    /// A vector of `ScriptChunk` values, or an error if the script is
    /// malformed.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    // -----------------------------------------------------------------------
    // Byte-pattern predicates
    // -----------------------------------------------------------------------

    /// Check if this is a Pay-to-Public-Key-Hash (P2PKH) output script.
    ///
    /// Pattern: OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
    ///
    /// # Returns
    /// `true` if the script matches the P2PKH pattern.
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Check if this is a Pay-to-Script-Hash (P2SH) output script.
    ///
    /// Pattern: OP_HASH160 <20 bytes> OP_EQUAL
    ///
    /// # Returns
    /// `true` if the script matches the P2SH pattern.
    pub fn is_p2sh(&self) -> bool {
        let b = &self.0;
        b.len() == 23
            && b[0] == OP_HASH160
            && b[1] == OP_DATA_20
            && b[22] == OP_EQUAL
    }

    // -----------------------------------------------------------------------
    // Mutation / building
    // -----------------------------------------------------------------------

    /// Append data bytes to the script with the proper PUSHDATA prefix.
    ///
    /// Chooses the minimal encoding: direct push for 1-75 bytes,
    /// OP_PUSHDATA1 for 76-255, OP_PUSHDATA2 for 256-65535, etc.
    ///
    /// # Arguments
    /// * `data` - The data bytes to push.
    ///
    /// # Returns
    /// `Ok(())` on success, or an error if the data is too large.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append hex-encoded data to the script with proper PUSHDATA prefix.
    ///
    /// # Arguments
    /// * `hex_str` - Hex string to decode and push.
    ///
    /// # Returns
    /// `Ok(())` on success, or an error if the hex is invalid or the
    /// data too large.
    pub fn append_push_data_hex(&mut self, hex_str: &str) -> Result<(), ScriptError> {
        let data = hex::decode(hex_str)
            .map_err(|_| ScriptError::InvalidOpcodeData)?;
        self.append_push_data(&data)
    }

    /// Append raw opcodes to the script.
    ///
    /// Rejects push data opcodes (OP_DATA_1..OP_PUSHDATA4) to prevent
    /// misuse. Use `append_push_data` for those.
    ///
    /// # Arguments
    /// * `opcodes` - Slice of opcode bytes to append.
    ///
    /// # Returns
    /// `Ok(())` on success, or an error if a push data opcode is
    /// encountered.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        for &op in opcodes {
            if op >= OP_DATA_1 && op <= OP_PUSHDATA4 {
                return Err(ScriptError::InvalidOpcodeType(opcode_to_string(op)));
            }
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }

    /// Return a copy of this script with every OP_CODESEPARATOR removed.
    ///
    /// This is the subscript transformation applied to a previous
    /// output's locking script before it enters the signature hash.
    /// An unparseable script is returned unchanged; it cannot carry a
    /// valid signature anyway.
    ///
    /// # Returns
    /// The script without code separators.
    pub fn delete_code_separators(&self) -> Script {
        match decode_script(&self.0) {
            Ok(chunks) => {
                let mut bytes = Vec::with_capacity(self.0.len());
                for chunk in chunks {
                    if chunk.op == OP_CODESEPARATOR {
                        continue;
                    }
                    bytes.extend_from_slice(&chunk.to_bytes());
                }
                Script(bytes)
            }
            Err(_) => self.clone(),
        }
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Script {
    /// Display the script as a lowercase hex string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Construction & roundtrip tests
    // -----------------------------------------------------------------------

    /// from_hex decodes a P2PKH script and to_hex round-trips it.
    #[test]
    fn test_from_hex_roundtrip() {
        let hex_str = "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac";
        let script = Script::from_hex(hex_str).expect("valid hex should parse");
        assert_eq!(script.to_hex(), hex_str);
    }

    #[test]
    fn test_from_hex_empty() {
        let script = Script::from_hex("").expect("empty hex should parse");
        assert!(script.is_empty());
        assert_eq!(script.to_hex(), "");
    }

    #[test]
    fn test_from_hex_invalid() {
        assert!(Script::from_hex("ZZZZ").is_err());
    }

    #[test]
    fn test_to_asm_p2pkh() {
        let script = Script::from_hex("76a914e2a623699e81b291c0327f408fea765d534baa2a88ac")
            .expect("valid hex should parse");
        assert_eq!(
            script.to_asm(),
            "OP_DUP OP_HASH160 e2a623699e81b291c0327f408fea765d534baa2a OP_EQUALVERIFY OP_CHECKSIG"
        );
    }

    #[test]
    fn test_from_asm_p2pkh() {
        let asm = "OP_DUP OP_HASH160 e2a623699e81b291c0327f408fea765d534baa2a OP_EQUALVERIFY OP_CHECKSIG";
        let script = Script::from_asm(asm).expect("valid ASM should parse");
        assert_eq!(
            script.to_hex(),
            "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac"
        );
    }

    /// hex -> ASM -> hex roundtrip preserves the script.
    #[test]
    fn test_hex_asm_roundtrip() {
        let hex_str = "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac";
        let script = Script::from_hex(hex_str).expect("valid hex should parse");
        let script2 = Script::from_asm(&script.to_asm()).expect("roundtrip ASM should parse");
        assert_eq!(script.to_hex(), script2.to_hex());
    }

    // -----------------------------------------------------------------------
    // Predicates
    // -----------------------------------------------------------------------

    #[test]
    fn test_is_p2pkh() {
        let script = Script::from_hex("76a91403ececf2d12a7f614aef4c82ecf13c303bd9975d88ac")
            .expect("valid hex");
        assert!(script.is_p2pkh());
        assert!(!script.is_p2sh());
    }

    #[test]
    fn test_is_p2sh() {
        let script = Script::from_hex("a9149de5aeaff9c48431ba4dd6e8af73d51f38e451cb87")
            .expect("valid hex");
        assert!(script.is_p2sh());
        assert!(!script.is_p2pkh());
    }

    // -----------------------------------------------------------------------
    // Append operations
    // -----------------------------------------------------------------------

    #[test]
    fn test_append_push_data_small() {
        let mut script = Script::new();
        script
            .append_push_data(&[0x01, 0x02, 0x03, 0x04, 0x05])
            .expect("push should succeed");
        assert_eq!(script.to_hex(), "050102030405");
    }

    #[test]
    fn test_append_push_data_medium() {
        let mut script = Script::new();
        let data = vec![0xAA; 80]; // 80 bytes triggers OP_PUSHDATA1
        script.append_push_data(&data).expect("push should succeed");
        let hex_str = script.to_hex();
        assert_eq!(&hex_str[..4], "4c50");
        assert_eq!(hex_str.len(), 4 + 80 * 2);
    }

    #[test]
    fn test_append_opcodes() {
        let mut script = Script::from_asm("OP_2 OP_2 OP_ADD").expect("valid ASM");
        script
            .append_opcodes(&[OP_EQUALVERIFY])
            .expect("should succeed");
        assert_eq!(script.to_asm(), "OP_2 OP_2 OP_ADD OP_EQUALVERIFY");
    }

    #[test]
    fn test_append_opcodes_rejects_pushdata() {
        let mut script = Script::new();
        assert!(script.append_opcodes(&[OP_PUSHDATA1]).is_err());
    }

    // -----------------------------------------------------------------------
    // Code separator removal
    // -----------------------------------------------------------------------

    #[test]
    fn test_delete_code_separators() {
        let mut script = Script::new();
        script.append_opcodes(&[OP_DUP, OP_CODESEPARATOR, OP_HASH160]).unwrap();
        script.append_push_data(&[0xAB; 20]).unwrap();
        script.append_opcodes(&[OP_CODESEPARATOR, OP_EQUALVERIFY, OP_CHECKSIG]).unwrap();

        let cleaned = script.delete_code_separators();
        let mut expected = Script::new();
        expected.append_opcodes(&[OP_DUP, OP_HASH160]).unwrap();
        expected.append_push_data(&[0xAB; 20]).unwrap();
        expected.append_opcodes(&[OP_EQUALVERIFY, OP_CHECKSIG]).unwrap();
        assert_eq!(cleaned, expected);
    }

    /// A script without separators is unchanged.
    #[test]
    fn test_delete_code_separators_noop() {
        let script = Script::from_hex("76a914e2a623699e81b291c0327f408fea765d534baa2a88ac")
            .unwrap();
        assert_eq!(script.delete_code_separators(), script);
    }

    /// A push whose data byte happens to be 0xab (OP_CODESEPARATOR) is
    /// not touched.
    #[test]
    fn test_delete_code_separators_ignores_pushed_data() {
        let mut script = Script::new();
        script.append_push_data(&[0xAB]).unwrap();
        assert_eq!(script.delete_code_separators(), script);
    }

    // -----------------------------------------------------------------------
    // Serialization (JSON)
    // -----------------------------------------------------------------------

    #[test]
    fn test_serde_roundtrip() {
        let script = Script::from_asm("OP_2 OP_2 OP_ADD OP_4 OP_EQUALVERIFY")
            .expect("valid ASM");
        let json_str = serde_json::to_string(&script).expect("should serialize");
        assert_eq!(json_str, r#""5252935488""#);
        let back: Script = serde_json::from_str(&json_str).expect("should deserialize");
        assert_eq!(back, script);
    }

    // -----------------------------------------------------------------------
    // Display / Debug
    // -----------------------------------------------------------------------

    #[test]
    fn test_display_and_debug() {
        let script = Script::from_hex("76a914e2a623699e81b291c0327f408fea765d534baa2a88ac")
            .expect("valid hex");
        assert_eq!(
            format!("{}", script),
            "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac"
        );
        assert!(format!("{:?}", script).starts_with("Script("));
    }
}
