//! Transaction output with satoshi value and locking script.
//!
//! Defines the spending conditions for the output's value. Provides
//! binary serialization following the Bitcoin wire format.

use txkit_primitives::util::{ByteReader, ByteWriter};
use txkit_script::Script;

use crate::TransactionError;

/// A single output in a transaction.
///
/// Immutable once constructed: each output specifies a satoshi `value`
/// and a `locking_script` (scriptPubKey) that defines the conditions
/// under which the funds may be spent.
///
/// # Wire format
///
/// | Field          | Size         |
/// |----------------|--------------|
/// | satoshis       | 8 bytes (LE) |
/// | script length  | compact size |
/// | locking_script | variable     |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutput {
    /// The number of satoshis locked by this output.
    pub satoshis: u64,

    /// The locking script (scriptPubKey) that defines spending conditions.
    pub locking_script: Script,
}

impl TransactionOutput {
    /// Create a new output.
    ///
    /// # Arguments
    /// * `satoshis` - The value in satoshis.
    /// * `locking_script` - The locking script.
    ///
    /// # Returns
    /// A `TransactionOutput`.
    pub fn new(satoshis: u64, locking_script: Script) -> Self {
        TransactionOutput {
            satoshis,
            locking_script,
        }
    }

    /// Deserialize a `TransactionOutput` from a `ByteReader`.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of an encoded output.
    ///
    /// # Returns
    /// `Ok(TransactionOutput)` on success, or a `TransactionError` if
    /// the data is truncated or malformed.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let satoshis = reader.read_u64_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading satoshis: {}", e))
        })?;
        let script_bytes = reader.read_var_bytes().map_err(|e| {
            TransactionError::SerializationError(format!("reading locking script: {}", e))
        })?;
        Ok(TransactionOutput {
            satoshis,
            locking_script: Script::from_bytes(script_bytes),
        })
    }

    /// Serialize this output into a `ByteWriter`.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u64_le(self.satoshis);
        writer.write_var_bytes(self.locking_script.to_bytes());
    }

    /// Serialize this output to a byte vector.
    ///
    /// # Returns
    /// A `Vec<u8>` containing the wire-format bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }
}
