//! Chain hash type for transaction identification.
//!
//! Provides a `Hash` type - a 32-byte array displayed as byte-reversed hex,
//! matching Bitcoin's convention for transaction ids: little-endian on the
//! wire, big-endian on screen.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PrimitivesError;

/// Size of a Hash in bytes.
pub const HASH_SIZE: usize = 32;

/// A 32-byte hash used for transaction ids.
///
/// The bytes are stored in internal (wire) order. When displayed as a
/// string, they are reversed to match Bitcoin's standard representation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Create a Hash from a raw 32-byte array.
    ///
    /// The bytes are stored as-is (internal byte order).
    ///
    /// # Arguments
    /// * `bytes` - The 32 bytes in internal (little-endian) order.
    ///
    /// # Returns
    /// A new `Hash`.
    pub fn new(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Create a Hash from a byte slice in internal order.
    ///
    /// # Arguments
    /// * `bytes` - A slice that must be exactly 32 bytes.
    ///
    /// # Returns
    /// `Ok(Hash)` if the slice is 32 bytes, or an error otherwise.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != HASH_SIZE {
            return Err(PrimitivesError::InvalidHash(format!(
                "invalid hash length of {}, want {}",
                bytes.len(),
                HASH_SIZE
            )));
        }
        let mut arr = [0u8; HASH_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Hash(arr))
    }

    /// Create a Hash from its display hex string (byte-reversed).
    ///
    /// This is the form transaction ids appear in on block explorers and
    /// on the command line: the 64 hex characters are decoded and the
    /// resulting bytes reversed into internal order.
    ///
    /// # Arguments
    /// * `hex_str` - A 64-character hex string in display order.
    ///
    /// # Returns
    /// `Ok(Hash)` on success, or an error if the hex is invalid or has
    /// the wrong length.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let mut bytes = hex::decode(hex_str)
            .map_err(|e| PrimitivesError::InvalidHex(e.to_string()))?;
        if bytes.len() != HASH_SIZE {
            return Err(PrimitivesError::InvalidHash(format!(
                "invalid hash hex length of {}, want {}",
                hex_str.len(),
                HASH_SIZE * 2
            )));
        }
        bytes.reverse();
        Self::from_bytes(&bytes)
    }

    /// Access the raw bytes in internal order.
    ///
    /// # Returns
    /// A reference to the 32-byte array.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Render the hash as a display hex string (byte-reversed).
    ///
    /// # Returns
    /// A 64-character hex string in display order.
    pub fn to_hex(&self) -> String {
        let mut reversed = self.0;
        reversed.reverse();
        hex::encode(reversed)
    }

    /// Check whether every byte of the hash is zero.
    ///
    /// An all-zero hash appears as the previous-transaction id of a
    /// coinbase input.
    ///
    /// # Returns
    /// `true` if all 32 bytes are zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl fmt::Display for Hash {
    /// Display the hash in byte-reversed hex, Bitcoin's standard form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Hash {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash::from_hex(s)
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The coinbase transaction id of Bitcoin block 1, in display order.
    const BLOCK1_COINBASE: &str =
        "0e3e2357e806b6cdb1f70b54c3a3a17b6714ee1f0e68bebb44a74b1efd512098";

    #[test]
    fn test_from_hex_roundtrip() {
        let hash = Hash::from_hex(BLOCK1_COINBASE).expect("valid hex");
        assert_eq!(hash.to_hex(), BLOCK1_COINBASE);
        assert_eq!(format!("{}", hash), BLOCK1_COINBASE);
    }

    #[test]
    fn test_from_hex_reverses_bytes() {
        let hash = Hash::from_hex(BLOCK1_COINBASE).expect("valid hex");
        // Display order starts 0e 3e ..., so internal order ends ... 3e 0e.
        assert_eq!(hash.as_bytes()[31], 0x0e);
        assert_eq!(hash.as_bytes()[30], 0x3e);
        assert_eq!(hash.as_bytes()[0], 0x98);
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(Hash::from_hex("0e3e").is_err());
        assert!(Hash::from_hex("zz").is_err());
        assert!(Hash::from_hex(&"00".repeat(33)).is_err());
    }

    #[test]
    fn test_from_bytes_length() {
        assert!(Hash::from_bytes(&[0u8; 32]).is_ok());
        assert!(Hash::from_bytes(&[0u8; 31]).is_err());
        assert!(Hash::from_bytes(&[0u8; 33]).is_err());
    }

    #[test]
    fn test_is_zero() {
        assert!(Hash::default().is_zero());
        assert!(!Hash::from_hex(BLOCK1_COINBASE).unwrap().is_zero());
    }

    #[test]
    fn test_serde_roundtrip() {
        let hash = Hash::from_hex(BLOCK1_COINBASE).unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", BLOCK1_COINBASE));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
