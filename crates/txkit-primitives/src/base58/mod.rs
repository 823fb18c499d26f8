//! Base58 encoding and decoding with optional checksum support.
//!
//! Provides raw Base58 encode/decode and Base58Check encode/decode
//! (with a 4-byte double-SHA-256 checksum) used for WIF private keys
//! and Bitcoin addresses.

use crate::hash::sha256d;
use crate::PrimitivesError;

/// Encode a byte slice to a Base58 string.
///
/// Uses Bitcoin's modified Base58 alphabet. Leading zero bytes
/// are encoded as leading '1' characters.
///
/// # Arguments
/// * `data` - The bytes to encode.
///
/// # Returns
/// A Base58-encoded string.
pub fn encode(data: &[u8]) -> String {
    bs58::encode(data).with_alphabet(bs58::Alphabet::BITCOIN).into_string()
}

/// Decode a Base58 string to a byte vector.
///
/// Leading '1' characters decode to leading zero bytes.
///
/// # Arguments
/// * `s` - The Base58 string to decode.
///
/// # Returns
/// `Ok(Vec<u8>)` on success, or an error for invalid characters.
pub fn decode(s: &str) -> Result<Vec<u8>, PrimitivesError> {
    bs58::decode(s)
        .with_alphabet(bs58::Alphabet::BITCOIN)
        .into_vec()
        .map_err(|e| PrimitivesError::InvalidBase58(e.to_string()))
}

/// Encode a byte slice with a 4-byte double-SHA-256 checksum appended
/// (Base58Check).
///
/// The checksum is the first 4 bytes of SHA-256d(data). The result
/// is `encode(data || checksum)`.
///
/// # Arguments
/// * `data` - The bytes to encode (typically version byte + payload).
///
/// # Returns
/// A Base58Check-encoded string.
pub fn check_encode(data: &[u8]) -> String {
    let checksum = sha256d(data);
    let mut payload = data.to_vec();
    payload.extend_from_slice(&checksum[..4]);
    encode(&payload)
}

/// Decode a Base58Check string, verifying the 4-byte checksum.
///
/// Strips and validates the trailing 4-byte double-SHA-256 checksum.
///
/// # Arguments
/// * `s` - The Base58Check string to decode.
///
/// # Returns
/// The payload with the checksum removed, or an error if the string is
/// too short or the checksum does not match.
pub fn check_decode(s: &str) -> Result<Vec<u8>, PrimitivesError> {
    let decoded = decode(s)?;
    if decoded.len() < 4 {
        return Err(PrimitivesError::InvalidBase58(format!(
            "decoded length {} too short for checksum",
            decoded.len()
        )));
    }
    let (payload, checksum) = decoded.split_at(decoded.len() - 4);
    let expected = sha256d(payload);
    if checksum != &expected[..4] {
        return Err(PrimitivesError::ChecksumMismatch);
    }
    Ok(payload.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let data = b"hello base58";
        let encoded = encode(data);
        let decoded = decode(&encoded).expect("should decode");
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_leading_zeros() {
        let data = [0u8, 0, 1, 2, 3];
        let encoded = encode(&data);
        assert!(encoded.starts_with("11"));
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_decode_invalid_char() {
        // '0' and 'O' are not in the Bitcoin alphabet.
        assert!(decode("0OIl").is_err());
    }

    #[test]
    fn test_check_encode_decode_roundtrip() {
        let payload = [0x80u8, 0xde, 0xad, 0xbe, 0xef];
        let encoded = check_encode(&payload);
        let decoded = check_decode(&encoded).expect("checksum should verify");
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_check_decode_bad_checksum() {
        // Corrupt the last character of a valid check-encoded string.
        let encoded = check_encode(&[0x01, 0x02, 0x03]);
        let mut corrupted = encoded.clone();
        let last = corrupted.pop().unwrap();
        corrupted.push(if last == '1' { '2' } else { '1' });
        assert!(check_decode(&corrupted).is_err());
    }

    /// A known address vector: version 0x00 plus the hash160 of the
    /// compressed generator point yields the well-known address.
    #[test]
    fn test_check_encode_address_vector() {
        let mut payload = vec![0x00u8];
        payload.extend_from_slice(
            &hex::decode("751e76e8199196d454941c45d1b3a323f1433bd6").unwrap(),
        );
        assert_eq!(check_encode(&payload), "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH");
    }
}
