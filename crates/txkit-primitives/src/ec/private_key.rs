//! secp256k1 private key with Bitcoin-specific functionality.
//!
//! Carries the raw scalar plus the compression preference for the
//! derived public key, and supports WIF encoding, deterministic
//! signing, and zeroization of the secret on drop.

use num_bigint::BigUint;
use num_traits::Zero;
use rand::RngCore;
use zeroize::Zeroize;

use crate::base58;
use crate::ec::curve::{to_bytes_32, Curve};
use crate::ec::public_key::PublicKey;
use crate::ec::signature::Signature;
use crate::PrimitivesError;

/// Length of a serialized private key in bytes.
const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// Mainnet WIF prefix byte.
const MAINNET_PREFIX: u8 = 0x80;

/// Testnet WIF prefix byte.
const TESTNET_PREFIX: u8 = 0xef;

/// Compression flag byte appended to WIF for compressed public keys.
const COMPRESS_MAGIC: u8 = 0x01;

/// A secp256k1 private key: a scalar in `[1, n-1]` plus the compression
/// choice for its public key.
///
/// The compression choice matters because the hash-160 used by P2PKH
/// depends on which public-key encoding was hashed. Keys imported from
/// WIF remember the form the WIF declared.
#[derive(Clone)]
pub struct PrivateKey {
    /// The private scalar, 32 bytes big-endian.
    secret: [u8; 32],
    /// Whether the derived public key serializes compressed.
    compressed: bool,
}

impl PrivateKey {
    /// Generate a new random private key using the OS random number
    /// generator.
    ///
    /// # Returns
    /// A new `PrivateKey` with compressed public-key preference.
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        let mut bytes = [0u8; 32];
        loop {
            rng.fill_bytes(&mut bytes);
            if let Ok(key) = Self::from_bytes(&bytes) {
                bytes.zeroize();
                return key;
            }
        }
    }

    /// Create a private key from a raw 32-byte scalar.
    ///
    /// # Arguments
    /// * `bytes` - A 32-byte big-endian scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` if the bytes represent a scalar in `[1, n-1]`,
    /// or an error if the scalar is zero or out of range.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_BYTES_LEN,
                bytes.len()
            )));
        }

        let scalar = BigUint::from_bytes_be(bytes);
        let curve = Curve::secp256k1();
        if scalar.is_zero() || scalar >= curve.n {
            return Err(PrimitivesError::InvalidPrivateKey(
                "scalar not in [1, n-1]".to_string(),
            ));
        }

        let mut secret = [0u8; 32];
        secret.copy_from_slice(bytes);
        Ok(PrivateKey {
            secret,
            compressed: true,
        })
    }

    /// Create a private key from a hexadecimal string.
    ///
    /// # Arguments
    /// * `hex_str` - A 64-character hex string representing the scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` on success, or an error if the hex or scalar is
    /// invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".to_string(),
            ));
        }
        let bytes =
            hex::decode(hex_str).map_err(|e| PrimitivesError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Create a private key from a WIF (Wallet Import Format) string.
    ///
    /// Decodes the Base58Check string, validates the checksum and the
    /// network prefix, and records whether the WIF declared a compressed
    /// public key (trailing `0x01` byte).
    ///
    /// # Arguments
    /// * `wif` - A Base58Check-encoded WIF string.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` on success, or an error if the WIF is malformed
    /// or the checksum fails.
    pub fn from_wif(wif: &str) -> Result<Self, PrimitivesError> {
        let payload = base58::check_decode(wif)
            .map_err(|e| PrimitivesError::InvalidWif(e.to_string()))?;

        // 1 prefix byte + 32 key bytes, plus an optional compression flag.
        let compressed = match payload.len() {
            34 => {
                if payload[33] != COMPRESS_MAGIC {
                    return Err(PrimitivesError::InvalidWif(
                        "malformed private key: invalid compression flag".to_string(),
                    ));
                }
                true
            }
            33 => false,
            n => {
                return Err(PrimitivesError::InvalidWif(format!(
                    "malformed private key: invalid length {}",
                    n
                )));
            }
        };

        if payload[0] != MAINNET_PREFIX && payload[0] != TESTNET_PREFIX {
            return Err(PrimitivesError::InvalidWif(format!(
                "unknown WIF network prefix {:#04x}",
                payload[0]
            )));
        }

        let mut key = Self::from_bytes(&payload[1..1 + PRIVATE_KEY_BYTES_LEN])?;
        key.compressed = compressed;
        Ok(key)
    }

    /// Encode the private key as a WIF string with the mainnet prefix.
    ///
    /// The compression flag follows this key's compression preference.
    ///
    /// # Returns
    /// A Base58Check-encoded WIF string.
    pub fn to_wif(&self) -> String {
        self.to_wif_prefix(MAINNET_PREFIX)
    }

    /// Encode the private key as a WIF string with a custom network prefix.
    ///
    /// # Arguments
    /// * `prefix` - The network prefix byte (0x80 mainnet, 0xef testnet).
    ///
    /// # Returns
    /// A Base58Check-encoded WIF string.
    pub fn to_wif_prefix(&self, prefix: u8) -> String {
        let mut payload = Vec::with_capacity(1 + PRIVATE_KEY_BYTES_LEN + 1);
        payload.push(prefix);
        payload.extend_from_slice(&self.secret);
        if self.compressed {
            payload.push(COMPRESS_MAGIC);
        }
        let encoded = base58::check_encode(&payload);
        payload.zeroize();
        encoded
    }

    /// Serialize the private key as a 32-byte big-endian array.
    ///
    /// # Returns
    /// A 32-byte array containing the private scalar.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.secret
    }

    /// Serialize the private key as a lowercase hexadecimal string.
    ///
    /// # Returns
    /// A 64-character hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.secret)
    }

    /// Whether the derived public key serializes compressed.
    pub fn compressed(&self) -> bool {
        self.compressed
    }

    /// Derive the corresponding public key for this private key.
    ///
    /// The public key inherits this key's compression preference.
    ///
    /// # Returns
    /// The `PublicKey` at `d * G`.
    pub fn public_key(&self) -> PublicKey {
        let curve = Curve::secp256k1();
        let point = curve.mul_g(&self.scalar());
        PublicKey::from_point(point, self.compressed)
            .expect("d in [1, n-1] always yields a curve point")
    }

    /// Sign a 32-byte message digest using RFC6979 deterministic nonces.
    ///
    /// Produces a low-S normalized signature.
    ///
    /// # Arguments
    /// * `digest` - The 32-byte message digest to sign.
    ///
    /// # Returns
    /// `Ok(Signature)` on success.
    pub fn sign(&self, digest: &[u8; 32]) -> Result<Signature, PrimitivesError> {
        Signature::sign(digest, self)
    }

    /// The private scalar as a big integer.
    pub(crate) fn scalar(&self) -> BigUint {
        BigUint::from_bytes_be(&self.secret)
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.secret == other.secret && self.compressed == other.compressed
    }
}

impl Eq for PrivateKey {}

impl std::fmt::Debug for PrivateKey {
    /// Never prints the secret.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("compressed", &self.compressed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::curve::Curve;

    /// WIF for scalar 1, compressed.
    const WIF_ONE_COMPRESSED: &str = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";
    /// WIF for scalar 1, uncompressed.
    const WIF_ONE_UNCOMPRESSED: &str = "5HpHagT65TZzG1PH3CSu63k8DbpvD8s5ip4nEB3kEsreAnchuDf";

    #[test]
    fn test_from_wif_compressed_scalar_one() {
        let key = PrivateKey::from_wif(WIF_ONE_COMPRESSED).expect("valid WIF");
        assert_eq!(
            key.to_hex(),
            "0000000000000000000000000000000000000000000000000000000000000001"
        );
        assert!(key.compressed());
        assert_eq!(key.to_wif(), WIF_ONE_COMPRESSED);
    }

    #[test]
    fn test_from_wif_uncompressed_scalar_one() {
        let key = PrivateKey::from_wif(WIF_ONE_UNCOMPRESSED).expect("valid WIF");
        assert_eq!(
            key.to_hex(),
            "0000000000000000000000000000000000000000000000000000000000000001"
        );
        assert!(!key.compressed());
        assert_eq!(key.to_wif(), WIF_ONE_UNCOMPRESSED);
    }

    /// The public key for scalar 1 is the generator point.
    #[test]
    fn test_public_key_of_scalar_one_is_generator() {
        let key = PrivateKey::from_wif(WIF_ONE_COMPRESSED).unwrap();
        assert_eq!(
            hex::encode(key.public_key().to_compressed()),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
        assert_eq!(
            hex::encode(key.public_key().to_uncompressed()),
            "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
             483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"
        );
    }

    #[test]
    fn test_serialization_roundtrips() {
        let key = PrivateKey::generate();

        let deserialized = PrivateKey::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(key, deserialized);

        let deserialized = PrivateKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(key, deserialized);

        let deserialized = PrivateKey::from_wif(&key.to_wif()).unwrap();
        assert_eq!(key, deserialized);
    }

    #[test]
    fn test_rejects_out_of_range_scalars() {
        assert!(PrivateKey::from_bytes(&[0u8; 32]).is_err());

        let curve = Curve::secp256k1();
        let order_bytes = to_bytes_32(&curve.n);
        assert!(PrivateKey::from_bytes(&order_bytes).is_err());

        assert!(PrivateKey::from_bytes(&[0xffu8; 32]).is_err());
        assert!(PrivateKey::from_bytes(&[1u8; 16]).is_err());
    }

    #[test]
    fn test_from_invalid_hex() {
        assert!(PrivateKey::from_hex("").is_err());
        assert!(PrivateKey::from_hex(WIF_ONE_COMPRESSED).is_err());
    }

    #[test]
    fn test_from_invalid_wif() {
        // modified character
        assert!(PrivateKey::from_wif("KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWm").is_err());
        // truncated
        assert!(PrivateKey::from_wif("KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoW").is_err());
        // not base58check at all
        assert!(PrivateKey::from_wif("not a wif").is_err());
    }

    #[test]
    fn test_sign_verify() {
        let key = PrivateKey::from_wif(WIF_ONE_COMPRESSED).unwrap();
        let digest = crate::hash::sha256d(b"message to authorize");
        let sig = key.sign(&digest).unwrap();
        assert!(sig.verify(&digest, &key.public_key()));
    }
}
