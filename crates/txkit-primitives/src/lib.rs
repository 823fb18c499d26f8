/// txkit - Hashes, wire codecs, base58check, and secp256k1 ECDSA.
///
/// This crate provides the foundational building blocks for the txkit
/// transaction tool:
/// - Hash functions (SHA-256, SHA-256d, RIPEMD-160, Hash160, HMAC)
/// - Chain hash type for transaction identification
/// - Little-endian integer and compact-size ("varint") wire codecs
/// - Base58 / Base58Check encoding
/// - secp256k1 ECDSA (field and group arithmetic, RFC6979 deterministic
///   nonces, DER signatures, WIF private keys)

pub mod hash;
pub mod chainhash;
pub mod util;
pub mod base58;
pub mod ec;

mod error;
pub use error::PrimitivesError;
