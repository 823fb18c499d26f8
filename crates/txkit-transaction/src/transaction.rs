//! Core transaction type.
//!
//! Represents a complete transaction with version, inputs, outputs, and
//! lock time. Supports binary and hex serialization, transaction id
//! computation, coinbase detection, and the unspents extension that
//! carries each input's previous-output context alongside the standard
//! encoding.

use txkit_primitives::chainhash::Hash;
use txkit_primitives::hash::sha256d;
use txkit_primitives::util::{ByteReader, ByteWriter, VarInt};

use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::spendable::Spendable;
use crate::TransactionError;

/// A Bitcoin transaction: a version, ordered inputs, ordered outputs,
/// and a lock time.
///
/// The transaction id is the double-SHA256 of the canonical encoding
/// with all unlocking scripts as they currently stand, so it is not
/// stable until signing is complete. Attached spendables never enter
/// the id.
///
/// # Wire format
///
/// | Field        | Size                 |
/// |--------------|----------------------|
/// | version      | 4 bytes (LE)         |
/// | input count  | compact size         |
/// | inputs       | variable (per input) |
/// | output count | compact size         |
/// | outputs      | variable (per output)|
/// | lock_time    | 4 bytes (LE)         |
#[derive(Clone, Debug)]
pub struct Transaction {
    /// Transaction format version, usually 1.
    pub version: u32,

    /// Ordered list of transaction inputs.
    pub inputs: Vec<TransactionInput>,

    /// Ordered list of transaction outputs.
    pub outputs: Vec<TransactionOutput>,

    /// Lock time. Zero means the transaction is valid anytime.
    pub lock_time: u32,
}

impl Transaction {
    /// Create a new empty transaction with version 1 and lock time 0.
    ///
    /// # Returns
    /// A `Transaction` with no inputs or outputs.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a transaction from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string of the raw transaction bytes.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` if the hex
    /// is invalid or the bytes do not form a valid transaction.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|e| {
            TransactionError::SerializationError(format!("invalid hex: {}", e))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse a transaction from raw bytes.
    ///
    /// The byte slice must contain exactly one complete transaction with
    /// no trailing data; use `from_bytes_with_spendables` to accept the
    /// unspents extension.
    ///
    /// # Arguments
    /// * `bytes` - The raw transaction bytes.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` if the data
    /// is truncated, malformed, or has trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Parse a transaction that may carry the unspents extension.
    ///
    /// After the standard serialization, the extension holds, for each
    /// non-coinbase input in order, the previous output's value (8 LE)
    /// and length-prefixed locking script; those spendables are
    /// re-attached to the inputs. The extension is all-or-nothing:
    /// leftover bytes that do not cover every non-coinbase input are an
    /// error.
    ///
    /// # Arguments
    /// * `bytes` - The raw bytes, with or without the extension.
    ///
    /// # Returns
    /// `Ok(Transaction)` with spendables attached when present.
    pub fn from_bytes_with_spendables(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let mut tx = Self::read_from(&mut reader)?;
        if reader.remaining() == 0 {
            return Ok(tx);
        }

        for input in tx.inputs.iter_mut() {
            if input.is_coinbase() {
                continue;
            }
            let spendable = Spendable::read_trailer(
                &mut reader,
                input.source_txid,
                input.source_index,
            )?;
            input.spendable = Some(spendable);
        }

        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after unspents extension",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Parse a hex string that may carry the unspents extension.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string of the raw bytes.
    ///
    /// # Returns
    /// `Ok(Transaction)` with spendables attached when present.
    pub fn from_hex_with_spendables(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|e| {
            TransactionError::SerializationError(format!("invalid hex: {}", e))
        })?;
        Self::from_bytes_with_spendables(&bytes)
    }

    /// Deserialize a transaction from a `ByteReader`.
    ///
    /// Reads the version, input count, inputs, output count, outputs,
    /// and lock time in standard wire format.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of a serialized
    ///   transaction.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `TransactionError` on format
    /// errors.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading version: {}", e))
        })?;

        let input_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading input count: {}", e))
        })?;

        let mut inputs = Vec::with_capacity(input_count.value().min(1024) as usize);
        for _ in 0..input_count.value() {
            inputs.push(TransactionInput::read_from(reader)?);
        }

        let output_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading output count: {}", e))
        })?;

        let mut outputs = Vec::with_capacity(output_count.value().min(1024) as usize);
        for _ in 0..output_count.value() {
            outputs.push(TransactionOutput::read_from(reader)?);
        }

        let lock_time = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading lock time: {}", e))
        })?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize this transaction to raw bytes.
    ///
    /// # Returns
    /// A `Vec<u8>` containing the standard wire-format bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(256);
        writer.write_u32_le(self.version);

        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut writer);
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer);
        }

        writer.write_u32_le(self.lock_time);
        writer.into_bytes()
    }

    /// Serialize this transaction to a hex string.
    ///
    /// # Returns
    /// A lowercase hex-encoded string of the raw bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Serialize with the unspents extension appended.
    ///
    /// For each non-coinbase input in order, the attached spendable's
    /// value and locking script follow the standard serialization. Every
    /// non-coinbase input must carry its spendable.
    ///
    /// # Returns
    /// The extended bytes, or `MissingSpendable` naming the first input
    /// without one.
    pub fn to_bytes_with_spendables(&self) -> Result<Vec<u8>, TransactionError> {
        let mut writer = ByteWriter::with_capacity(256);
        writer.write_bytes(&self.to_bytes());
        for (i, input) in self.inputs.iter().enumerate() {
            if input.is_coinbase() {
                continue;
            }
            let spendable = input
                .spendable
                .as_ref()
                .ok_or(TransactionError::MissingSpendable(i))?;
            spendable.write_trailer(&mut writer);
        }
        Ok(writer.into_bytes())
    }

    /// Serialize with the unspents extension to hex.
    ///
    /// # Returns
    /// The extended serialization as a hex string.
    pub fn to_hex_with_spendables(&self) -> Result<String, TransactionError> {
        Ok(hex::encode(self.to_bytes_with_spendables()?))
    }

    // -----------------------------------------------------------------
    // Transaction id
    // -----------------------------------------------------------------

    /// Compute the transaction id (double SHA-256 of the plain
    /// serialization, unspents stripped).
    ///
    /// # Returns
    /// The txid in internal byte order.
    pub fn txid(&self) -> Hash {
        Hash::new(sha256d(&self.to_bytes()))
    }

    /// Compute the transaction id as a display hex string
    /// (byte-reversed).
    ///
    /// # Returns
    /// A 64-character hex string of the txid.
    pub fn txid_hex(&self) -> String {
        self.txid().to_hex()
    }

    // -----------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------

    /// Append a `TransactionInput` to this transaction.
    pub fn add_input(&mut self, input: TransactionInput) {
        self.inputs.push(input);
    }

    /// Append a `TransactionOutput` to this transaction.
    pub fn add_output(&mut self, output: TransactionOutput) {
        self.outputs.push(output);
    }

    /// Determine whether this transaction is a coinbase transaction:
    /// exactly one input with the coinbase outpoint pattern.
    ///
    /// # Returns
    /// `true` if this is a coinbase transaction.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase()
    }

    /// Return the size of this transaction in bytes.
    ///
    /// # Returns
    /// The byte length of the plain serialization.
    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }

    // -----------------------------------------------------------------
    // Totals and fees
    // -----------------------------------------------------------------

    /// Compute the sum of all output satoshi values.
    ///
    /// # Returns
    /// The total satoshis across all outputs.
    pub fn total_output_satoshis(&self) -> u64 {
        self.outputs.iter().map(|o| o.satoshis).sum()
    }

    /// Compute the sum of all input values from their spendables.
    ///
    /// A coinbase input contributes its spendable's value when one is
    /// attached, zero otherwise.
    ///
    /// # Returns
    /// `Some(total)` when every non-coinbase input has its spendable,
    /// `None` otherwise.
    pub fn total_input_satoshis(&self) -> Option<u64> {
        let mut total = 0u64;
        for input in &self.inputs {
            match input.source_satoshis() {
                Some(sats) => total += sats,
                None if input.is_coinbase() => {}
                None => return None,
            }
        }
        Some(total)
    }

    /// Compute the fee: input total minus output total.
    ///
    /// # Returns
    /// `Some(fee)` when the input total is known, `None` otherwise.
    /// Negative when the outputs exceed the inputs.
    pub fn fee(&self) -> Option<i64> {
        self.total_input_satoshis()
            .map(|input_total| input_total as i64 - self.total_output_satoshis() as i64)
    }

    /// Whether every non-coinbase input has its spendable attached.
    pub fn all_spendables_attached(&self) -> bool {
        self.inputs
            .iter()
            .all(|i| i.is_coinbase() || i.spendable.is_some())
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Transaction {
    /// Display the transaction as its hex-encoded serialization.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txkit_script::Script;

    /// The coinbase transaction of Bitcoin block 1.
    const BLOCK1_COINBASE_HEX: &str =
        "01000000010000000000000000000000000000000000000000000000000000000000000000\
         ffffffff0704ffff001d0104ffffffff0100f2052a0100000043410496b538e853519c726a\
         2c91e61ec11600ae1390813a627c66fb8be7947be63c52da7589379515d4e0a604f8141781\
         e62294721166bf621e73a82cbf2342c858eeac00000000";

    const BLOCK1_COINBASE_TXID: &str =
        "0e3e2357e806b6cdb1f70b54c3a3a17b6714ee1f0e68bebb44a74b1efd512098";

    #[test]
    fn test_parse_block1_coinbase() {
        let tx = Transaction::from_hex(BLOCK1_COINBASE_HEX).expect("parses");
        assert_eq!(tx.version, 1);
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.lock_time, 0);
        assert!(tx.is_coinbase());
        assert_eq!(tx.outputs[0].satoshis, 5_000_000_000);
    }

    /// serialize(parse(bytes)) is the identity on well-formed input.
    #[test]
    fn test_serialize_parse_identity() {
        let tx = Transaction::from_hex(BLOCK1_COINBASE_HEX).unwrap();
        assert_eq!(tx.to_hex(), BLOCK1_COINBASE_HEX);
    }

    /// The txid is the double-SHA256 of the serialization, displayed
    /// byte-reversed.
    #[test]
    fn test_txid_matches_chain() {
        let tx = Transaction::from_hex(BLOCK1_COINBASE_HEX).unwrap();
        assert_eq!(tx.txid_hex(), BLOCK1_COINBASE_TXID);
    }

    #[test]
    fn test_size() {
        let tx = Transaction::from_hex(BLOCK1_COINBASE_HEX).unwrap();
        assert_eq!(tx.size(), BLOCK1_COINBASE_HEX.len() / 2);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = hex::decode(BLOCK1_COINBASE_HEX).unwrap();
        bytes.push(0x00);
        assert!(Transaction::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_truncated_rejected() {
        let bytes = hex::decode(BLOCK1_COINBASE_HEX).unwrap();
        assert!(Transaction::from_bytes(&bytes[..bytes.len() - 2]).is_err());
    }

    fn spend_skeleton() -> Transaction {
        let mut tx = Transaction::new();
        let source = Transaction::from_hex(BLOCK1_COINBASE_HEX).unwrap();
        let spendable = Spendable::from_tx_out(&source, 0).unwrap();
        tx.add_input(TransactionInput::from_spendable(spendable));
        tx.add_output(TransactionOutput::new(
            4_999_900_000,
            Script::from_hex("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac").unwrap(),
        ));
        tx
    }

    #[test]
    fn test_totals_and_fee() {
        let tx = spend_skeleton();
        assert_eq!(tx.total_input_satoshis(), Some(5_000_000_000));
        assert_eq!(tx.total_output_satoshis(), 4_999_900_000);
        assert_eq!(tx.fee(), Some(100_000));
        assert!(tx.all_spendables_attached());
    }

    #[test]
    fn test_totals_unknown_without_spendable() {
        let mut tx = spend_skeleton();
        tx.inputs[0].spendable = None;
        assert_eq!(tx.total_input_satoshis(), None);
        assert_eq!(tx.fee(), None);
        assert!(!tx.all_spendables_attached());
    }

    /// The unspents extension round-trips and never changes the txid.
    #[test]
    fn test_spendables_extension_roundtrip() {
        let tx = spend_skeleton();
        let plain = tx.to_bytes();
        let extended = tx.to_bytes_with_spendables().expect("has spendables");
        assert!(extended.len() > plain.len());
        assert_eq!(&extended[..plain.len()], &plain[..]);

        let back = Transaction::from_bytes_with_spendables(&extended).expect("parses");
        assert!(back.all_spendables_attached());
        assert_eq!(back.inputs[0].spendable, tx.inputs[0].spendable);
        assert_eq!(back.txid(), tx.txid());
        assert_eq!(back.to_bytes(), plain);

        // Plain bytes also parse through the extended entry point.
        let plain_back = Transaction::from_bytes_with_spendables(&plain).expect("parses");
        assert!(plain_back.inputs[0].spendable.is_none());
    }

    #[test]
    fn test_spendables_extension_partial_is_error() {
        let tx = spend_skeleton();
        let extended = tx.to_bytes_with_spendables().unwrap();
        // Chop two bytes off the trailer.
        assert!(Transaction::from_bytes_with_spendables(&extended[..extended.len() - 2]).is_err());
        // Extra garbage after the trailer.
        let mut longer = extended.clone();
        longer.push(0xff);
        assert!(Transaction::from_bytes_with_spendables(&longer).is_err());
    }

    #[test]
    fn test_missing_spendable_blocks_extension() {
        let mut tx = spend_skeleton();
        tx.inputs[0].spendable = None;
        assert!(matches!(
            tx.to_bytes_with_spendables(),
            Err(TransactionError::MissingSpendable(0))
        ));
    }

    /// A coinbase transaction has no trailer entries at all.
    #[test]
    fn test_coinbase_has_empty_extension() {
        let tx = Transaction::from_hex(BLOCK1_COINBASE_HEX).unwrap();
        let extended = tx.to_bytes_with_spendables().unwrap();
        assert_eq!(extended, tx.to_bytes());
    }
}
