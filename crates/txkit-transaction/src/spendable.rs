//! The spendable model: a previous output bound to the input spending it.
//!
//! A `Spendable` carries the outpoint coordinates of a prior output plus
//! that output's locking script and satoshi value. It is what signing
//! needs (the script), what fee computation needs (the value), and what
//! verification needs (both).

use txkit_primitives::chainhash::Hash;
use txkit_primitives::util::{ByteReader, ByteWriter};
use txkit_script::Script;

use crate::transaction::Transaction;
use crate::TransactionError;

/// A previous transaction output together with its identifying
/// coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spendable {
    /// The id of the transaction that created the output, in internal
    /// (wire) byte order.
    pub source_txid: [u8; 32],
    /// The index of the output within that transaction.
    pub source_index: u32,
    /// The output's locking script.
    pub locking_script: Script,
    /// The output's value in satoshis.
    pub satoshis: u64,
}

impl Spendable {
    /// Build a spendable from an output of a known transaction.
    ///
    /// # Arguments
    /// * `tx` - The transaction holding the output.
    /// * `index` - The output index.
    ///
    /// # Returns
    /// `Ok(Spendable)` or an error if the index is out of range.
    pub fn from_tx_out(tx: &Transaction, index: u32) -> Result<Self, TransactionError> {
        let output = tx.outputs.get(index as usize).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!(
                "output index {} out of range (tx has {} outputs)",
                index,
                tx.outputs.len()
            ))
        })?;
        Ok(Spendable {
            source_txid: *tx.txid().as_bytes(),
            source_index: index,
            locking_script: output.locking_script.clone(),
            satoshis: output.satoshis,
        })
    }

    /// Parse the `txid/index/script_hex/value` text descriptor.
    ///
    /// The txid is in display (byte-reversed) order, the script is hex,
    /// and the value is in satoshis.
    ///
    /// # Arguments
    /// * `descriptor` - The slash-separated descriptor string.
    ///
    /// # Returns
    /// `Ok(Spendable)` or an error naming the malformed field.
    pub fn from_descriptor(descriptor: &str) -> Result<Self, TransactionError> {
        let parts: Vec<&str> = descriptor.split('/').collect();
        if parts.len() != 4 {
            return Err(TransactionError::InvalidSpendable(format!(
                "expected txid/index/script_hex/value, got {} fields",
                parts.len()
            )));
        }

        let txid = Hash::from_hex(parts[0]).map_err(|e| {
            TransactionError::InvalidSpendable(format!("bad txid: {}", e))
        })?;
        let source_index: u32 = parts[1].parse().map_err(|_| {
            TransactionError::InvalidSpendable(format!("bad output index '{}'", parts[1]))
        })?;
        let locking_script = Script::from_hex(parts[2]).map_err(|e| {
            TransactionError::InvalidSpendable(format!("bad script hex: {}", e))
        })?;
        let satoshis: u64 = parts[3].parse().map_err(|_| {
            TransactionError::InvalidSpendable(format!("bad satoshi value '{}'", parts[3]))
        })?;

        Ok(Spendable {
            source_txid: *txid.as_bytes(),
            source_index,
            locking_script,
            satoshis,
        })
    }

    /// Render the `txid/index/script_hex/value` text descriptor.
    ///
    /// # Returns
    /// The descriptor string, with the txid in display order.
    pub fn to_descriptor(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            Hash::new(self.source_txid),
            self.source_index,
            self.locking_script.to_hex(),
            self.satoshis
        )
    }

    /// Write the unspents-trailer form: value (8 LE) then the
    /// length-prefixed locking script.
    ///
    /// The outpoint is not written; it is implied by the input this
    /// spendable is attached to.
    ///
    /// # Arguments
    /// * `writer` - The writer to append to.
    pub fn write_trailer(&self, writer: &mut ByteWriter) {
        writer.write_u64_le(self.satoshis);
        writer.write_var_bytes(self.locking_script.to_bytes());
    }

    /// Read the unspents-trailer form for the given outpoint.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at a trailer entry.
    /// * `source_txid` - The outpoint txid, from the owning input.
    /// * `source_index` - The outpoint index, from the owning input.
    ///
    /// # Returns
    /// `Ok(Spendable)` or a serialization error on truncation.
    pub fn read_trailer(
        reader: &mut ByteReader,
        source_txid: [u8; 32],
        source_index: u32,
    ) -> Result<Self, TransactionError> {
        let satoshis = reader.read_u64_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading spendable value: {}", e))
        })?;
        let script_bytes = reader.read_var_bytes().map_err(|e| {
            TransactionError::SerializationError(format!("reading spendable script: {}", e))
        })?;
        Ok(Spendable {
            source_txid,
            source_index,
            locking_script: Script::from_bytes(script_bytes),
            satoshis,
        })
    }
}
