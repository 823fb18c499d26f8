//! secp256k1 elliptic curve cryptography.
//!
//! Field and group arithmetic, private/public keys, and ECDSA signatures
//! with RFC6979 deterministic nonces and DER serialization.

pub mod curve;
pub mod private_key;
pub mod public_key;
pub mod signature;

mod nonce;

pub use curve::{Curve, Point};
pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::Signature;
