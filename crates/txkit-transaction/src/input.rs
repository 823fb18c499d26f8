//! Transaction input referencing a previous output.
//!
//! Contains the source transaction id, output index, unlocking script,
//! and sequence number, plus an optional attached `Spendable` carrying
//! the previous output's locking script and value. Provides binary
//! serialization following the Bitcoin wire format.

use txkit_primitives::util::{ByteReader, ByteWriter};
use txkit_script::Script;

use crate::spendable::Spendable;
use crate::TransactionError;

/// Default sequence number indicating a finalized input.
pub const DEFAULT_SEQUENCE: u32 = 0xFFFF_FFFF;

/// The output index a coinbase input carries.
pub const COINBASE_INDEX: u32 = 0xFFFF_FFFF;

/// A single input in a transaction.
///
/// Each input references an output from a previous transaction by its
/// transaction id (`source_txid`, internal byte order) and output index.
/// The `unlocking_script` (scriptSig) supplies the data required to
/// satisfy the referenced output's locking script; it is `None` while
/// the input is unsigned.
///
/// The attached `Spendable` is out-of-band context, never serialized
/// into the standard wire format: signing needs its locking script, fee
/// computation its value, verification both.
///
/// # Wire format
///
/// | Field            | Size             |
/// |------------------|------------------|
/// | source_txid      | 32 bytes         |
/// | source_index     | 4 bytes (LE)     |
/// | script length    | compact size     |
/// | unlocking_script | variable         |
/// | sequence         | 4 bytes (LE)     |
#[derive(Clone, Debug)]
pub struct TransactionInput {
    /// The 32-byte transaction id of the output being spent, in
    /// internal (little-endian) byte order.
    pub source_txid: [u8; 32],

    /// Index of the output within the source transaction.
    pub source_index: u32,

    /// The unlocking script (scriptSig). `None` when unsigned.
    pub unlocking_script: Option<Script>,

    /// Sequence number. Defaults to `0xFFFFFFFF` (finalized).
    pub sequence: u32,

    /// The previous output this input consumes, when known.
    pub spendable: Option<Spendable>,
}

impl TransactionInput {
    /// Create a new `TransactionInput` with default values.
    ///
    /// # Returns
    /// An input with a zeroed source txid, index 0, finalized sequence,
    /// and no unlocking script or spendable.
    pub fn new() -> Self {
        TransactionInput {
            source_txid: [0u8; 32],
            source_index: 0,
            unlocking_script: None,
            sequence: DEFAULT_SEQUENCE,
            spendable: None,
        }
    }

    /// Create an input spending the given spendable, attaching it.
    ///
    /// # Arguments
    /// * `spendable` - The previous output to consume.
    ///
    /// # Returns
    /// An unsigned input referencing the spendable's outpoint.
    pub fn from_spendable(spendable: Spendable) -> Self {
        TransactionInput {
            source_txid: spendable.source_txid,
            source_index: spendable.source_index,
            unlocking_script: None,
            sequence: DEFAULT_SEQUENCE,
            spendable: Some(spendable),
        }
    }

    /// Deserialize a `TransactionInput` from a `ByteReader`.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of an encoded input.
    ///
    /// # Returns
    /// `Ok(TransactionInput)` on success, or a `TransactionError` if the
    /// data is truncated or malformed.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let txid_bytes = reader.read_bytes(32).map_err(|e| {
            TransactionError::SerializationError(format!("reading source txid: {}", e))
        })?;
        let mut source_txid = [0u8; 32];
        source_txid.copy_from_slice(txid_bytes);

        let source_index = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output index: {}", e))
        })?;

        let script_bytes = reader.read_var_bytes().map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;

        let sequence = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence number: {}", e))
        })?;

        let unlocking_script = if script_bytes.is_empty() {
            None
        } else {
            Some(Script::from_bytes(script_bytes))
        };

        Ok(TransactionInput {
            source_txid,
            source_index,
            unlocking_script,
            sequence,
            spendable: None,
        })
    }

    /// Serialize this input into a `ByteWriter`.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.source_txid);
        writer.write_u32_le(self.source_index);
        match &self.unlocking_script {
            Some(script) => writer.write_var_bytes(script.to_bytes()),
            None => writer.write_var_bytes(&[]),
        }
        writer.write_u32_le(self.sequence);
    }

    /// Determine whether this input is the coinbase pattern: all-zero
    /// source txid and index `0xFFFFFFFF`.
    ///
    /// # Returns
    /// `true` for a coinbase input.
    pub fn is_coinbase(&self) -> bool {
        self.source_txid == [0u8; 32] && self.source_index == COINBASE_INDEX
    }

    /// The satoshi value of the previous output, when the spendable is
    /// attached.
    pub fn source_satoshis(&self) -> Option<u64> {
        self.spendable.as_ref().map(|s| s.satoshis)
    }

    /// The locking script of the previous output, when the spendable is
    /// attached.
    pub fn source_locking_script(&self) -> Option<&Script> {
        self.spendable.as_ref().map(|s| &s.locking_script)
    }
}

impl Default for TransactionInput {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_roundtrip() {
        let mut input = TransactionInput::new();
        input.source_txid = [0x11; 32];
        input.source_index = 3;
        input.unlocking_script = Some(Script::from_bytes(&[0x51]));
        input.sequence = 0xfffffffe;

        let mut writer = ByteWriter::new();
        input.write_to(&mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 32 + 4 + 1 + 1 + 4);

        let mut reader = ByteReader::new(&bytes);
        let back = TransactionInput::read_from(&mut reader).expect("parses");
        assert_eq!(back.source_txid, input.source_txid);
        assert_eq!(back.source_index, 3);
        assert_eq!(back.unlocking_script.as_ref().map(|s| s.to_hex()), Some("51".into()));
        assert_eq!(back.sequence, 0xfffffffe);
    }

    #[test]
    fn test_empty_script_reads_as_none() {
        let mut input = TransactionInput::new();
        input.source_txid = [0x22; 32];
        let mut writer = ByteWriter::new();
        input.write_to(&mut writer);
        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        let back = TransactionInput::read_from(&mut reader).unwrap();
        assert!(back.unlocking_script.is_none());
    }

    #[test]
    fn test_is_coinbase() {
        let mut input = TransactionInput::new();
        assert!(!input.is_coinbase());
        input.source_index = COINBASE_INDEX;
        assert!(input.is_coinbase());
        input.source_txid = [1; 32];
        assert!(!input.is_coinbase());
    }

    #[test]
    fn test_truncated_input_fails() {
        let mut reader = ByteReader::new(&[0u8; 20]);
        assert!(TransactionInput::read_from(&mut reader).is_err());
    }
}
