/// Bitcoin address handling.
///
/// Supports P2PKH and P2SH addresses on mainnet and testnet, with
/// Base58Check encoding and SHA-256d checksums.

use std::fmt;

use txkit_primitives::base58;

use crate::ScriptError;

/// Mainnet P2PKH address version byte.
const MAINNET_P2PKH: u8 = 0x00;
/// Mainnet P2SH address version byte.
const MAINNET_P2SH: u8 = 0x05;
/// Testnet P2PKH address version byte.
const TESTNET_P2PKH: u8 = 0x6f;
/// Testnet P2SH address version byte.
const TESTNET_P2SH: u8 = 0xc4;

/// Bitcoin network type for address prefix selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Network {
    /// Bitcoin mainnet (P2PKH addresses start with '1', P2SH with '3').
    Mainnet,
    /// Bitcoin testnet (P2PKH addresses start with 'm' or 'n').
    Testnet,
}

/// What the address's 20-byte hash commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressKind {
    /// Hash160 of a public key (P2PKH).
    PubKeyHash,
    /// Hash160 of a redeem script (P2SH).
    ScriptHash,
}

/// A Bitcoin base58check address.
///
/// Contains the 20-byte hash, the hash kind, and the network. Can be
/// serialized to/from the Base58Check string format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    /// The human-readable Base58Check address string.
    pub address_string: String,
    /// The 20-byte hash the address commits to.
    pub hash160: [u8; 20],
    /// Whether the hash is of a public key or a redeem script.
    pub kind: AddressKind,
    /// The network this address belongs to.
    pub network: Network,
}

impl Address {
    /// Parse a Base58Check-encoded address string.
    ///
    /// Decodes the string, validates the checksum, and detects the
    /// network and hash kind from the version byte.
    ///
    /// # Arguments
    /// * `addr` - The Base58Check address string.
    ///
    /// # Returns
    /// An `Address` or an error if the string is invalid.
    pub fn from_string(addr: &str) -> Result<Self, ScriptError> {
        let decoded = base58::check_decode(addr)
            .map_err(|_| ScriptError::InvalidAddress(format!("bad encoding for '{}'", addr)))?;

        if decoded.len() != 21 {
            return Err(ScriptError::InvalidAddressLength(addr.to_string()));
        }

        let (kind, network) = match decoded[0] {
            MAINNET_P2PKH => (AddressKind::PubKeyHash, Network::Mainnet),
            MAINNET_P2SH => (AddressKind::ScriptHash, Network::Mainnet),
            TESTNET_P2PKH => (AddressKind::PubKeyHash, Network::Testnet),
            TESTNET_P2SH => (AddressKind::ScriptHash, Network::Testnet),
            _ => return Err(ScriptError::UnsupportedAddress(addr.to_string())),
        };

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&decoded[1..21]);

        Ok(Address {
            address_string: addr.to_string(),
            hash160: hash,
            kind,
            network,
        })
    }

    /// Create a P2PKH address from a 20-byte public key hash.
    ///
    /// # Arguments
    /// * `hash` - The hash160 of the public key.
    /// * `network` - The target network.
    ///
    /// # Returns
    /// A new `Address` with the encoded Base58Check string.
    pub fn from_public_key_hash(hash: &[u8; 20], network: Network) -> Self {
        let version = match network {
            Network::Mainnet => MAINNET_P2PKH,
            Network::Testnet => TESTNET_P2PKH,
        };
        Self::encode(hash, version, AddressKind::PubKeyHash, network)
    }

    /// Create a P2SH address from a 20-byte script hash.
    ///
    /// # Arguments
    /// * `hash` - The hash160 of the redeem script.
    /// * `network` - The target network.
    ///
    /// # Returns
    /// A new `Address` with the encoded Base58Check string.
    pub fn from_script_hash(hash: &[u8; 20], network: Network) -> Self {
        let version = match network {
            Network::Mainnet => MAINNET_P2SH,
            Network::Testnet => TESTNET_P2SH,
        };
        Self::encode(hash, version, AddressKind::ScriptHash, network)
    }

    fn encode(hash: &[u8; 20], version: u8, kind: AddressKind, network: Network) -> Self {
        let mut payload = Vec::with_capacity(21);
        payload.push(version);
        payload.extend_from_slice(hash);
        Address {
            address_string: base58::check_encode(&payload),
            hash160: *hash,
            kind,
            network,
        }
    }
}

impl fmt::Display for Address {
    /// Display the address as its Base58Check string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hash160 of the compressed public key for scalar 1.
    const GENERATOR_PKH: &str = "751e76e8199196d454941c45d1b3a323f1433bd6";

    #[test]
    fn test_from_public_key_hash_mainnet() {
        let hash_bytes = hex::decode(GENERATOR_PKH).unwrap();
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&hash_bytes);
        let addr = Address::from_public_key_hash(&hash, Network::Mainnet);
        assert_eq!(addr.address_string, "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH");
        assert_eq!(addr.kind, AddressKind::PubKeyHash);
        assert_eq!(addr.network, Network::Mainnet);
    }

    #[test]
    fn test_from_string_mainnet() {
        let addr = Address::from_string("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH")
            .expect("should parse mainnet");
        assert_eq!(hex::encode(addr.hash160), GENERATOR_PKH);
        assert_eq!(addr.kind, AddressKind::PubKeyHash);
        assert_eq!(addr.network, Network::Mainnet);
    }

    #[test]
    fn test_from_string_testnet() {
        let addr = Address::from_string("mtdruWYVEV1wz5yL7GvpBj4MgifCB7yhPd")
            .expect("should parse testnet");
        assert_eq!(
            hex::encode(addr.hash160),
            "8fe80c75c9560e8b56ed64ea3c26e18d2c52211b"
        );
        assert_eq!(addr.network, Network::Testnet);
    }

    #[test]
    fn test_script_hash_roundtrip() {
        let hash = [0x42u8; 20];
        let addr = Address::from_script_hash(&hash, Network::Mainnet);
        assert!(addr.address_string.starts_with('3'));
        let parsed = Address::from_string(&addr.address_string).expect("should parse back");
        assert_eq!(parsed.kind, AddressKind::ScriptHash);
        assert_eq!(parsed.hash160, hash);
    }

    #[test]
    fn test_from_string_bad_checksum() {
        // Flip the last character of a valid address.
        assert!(Address::from_string("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMJ").is_err());
    }

    #[test]
    fn test_from_string_short_address() {
        assert!(Address::from_string("ADD8E55").is_err());
    }

    #[test]
    fn test_public_key_hash_roundtrip() {
        let hash = [0x11u8; 20];
        let addr = Address::from_public_key_hash(&hash, Network::Mainnet);
        let parsed = Address::from_string(&addr.address_string).expect("should parse back");
        assert_eq!(parsed.hash160, hash);
        assert_eq!(parsed.network, Network::Mainnet);
        assert_eq!(format!("{}", parsed), addr.address_string);
    }
}
