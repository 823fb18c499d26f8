//! secp256k1 public key with SEC1 point encodings.
//!
//! Supports the 33-byte compressed (`0x02`/`0x03` prefix) and 65-byte
//! uncompressed (`0x04` prefix) forms, Hash160 derivation for P2PKH,
//! and signature verification.

use num_bigint::BigUint;
use num_traits::One;

use crate::ec::curve::{to_bytes_32, Curve, Point};
use crate::ec::signature::Signature;
use crate::hash::hash160;
use crate::PrimitivesError;

/// A secp256k1 public key: a curve point plus the preferred encoding.
///
/// The encoding preference controls `to_bytes` and therefore `hash160`,
/// which is why it travels with the point: a compressed and an
/// uncompressed rendition of the same point hash to different P2PKH
/// addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    /// The affine x coordinate.
    x: BigUint,
    /// The affine y coordinate.
    y: BigUint,
    /// Whether `to_bytes` produces the 33-byte compressed form.
    compressed: bool,
}

impl PublicKey {
    /// Create a public key from a curve point.
    ///
    /// # Arguments
    /// * `point` - The curve point; must not be the identity.
    /// * `compressed` - The preferred serialization form.
    ///
    /// # Returns
    /// `Ok(PublicKey)` or an error for the identity point.
    pub fn from_point(point: Point, compressed: bool) -> Result<Self, PrimitivesError> {
        match point {
            Point::Infinity => Err(PrimitivesError::InvalidPublicKey(
                "public key cannot be the point at infinity".to_string(),
            )),
            Point::Affine { x, y } => Ok(PublicKey { x, y, compressed }),
        }
    }

    /// Parse a public key from SEC1 bytes.
    ///
    /// Accepts the 33-byte compressed form (`0x02`/`0x03` prefix, x
    /// coordinate only, y recovered from the curve equation) and the
    /// 65-byte uncompressed form (`0x04` prefix, x and y). Points not
    /// on the curve are rejected.
    ///
    /// # Arguments
    /// * `bytes` - The encoded public key.
    ///
    /// # Returns
    /// `Ok(PublicKey)` remembering the encoding it was parsed from, or
    /// an error for malformed or off-curve input.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let curve = Curve::secp256k1();
        match bytes.first() {
            Some(0x02) | Some(0x03) if bytes.len() == 33 => {
                let x = BigUint::from_bytes_be(&bytes[1..33]);
                let odd_y = bytes[0] == 0x03;
                let point = curve.lift_x(&x, odd_y)?;
                Self::from_point(point, true)
            }
            Some(0x04) if bytes.len() == 65 => {
                let x = BigUint::from_bytes_be(&bytes[1..33]);
                let y = BigUint::from_bytes_be(&bytes[33..65]);
                let point = Point::Affine { x, y };
                if !curve.contains(&point) {
                    return Err(PrimitivesError::PointNotOnCurve);
                }
                Self::from_point(point, false)
            }
            _ => Err(PrimitivesError::InvalidPublicKey(format!(
                "unsupported public key encoding of {} bytes",
                bytes.len()
            ))),
        }
    }

    /// Parse a public key from a hex string.
    ///
    /// # Arguments
    /// * `hex_str` - Hex of the 33- or 65-byte encoding.
    ///
    /// # Returns
    /// `Ok(PublicKey)` on success.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let bytes =
            hex::decode(hex_str).map_err(|e| PrimitivesError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Serialize in the key's preferred form.
    ///
    /// # Returns
    /// 33 bytes when compressed, 65 bytes otherwise.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.compressed {
            self.to_compressed()
        } else {
            self.to_uncompressed()
        }
    }

    /// Serialize in the 33-byte compressed form.
    ///
    /// # Returns
    /// `0x02/0x03 || X`.
    pub fn to_compressed(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(33);
        let y_is_odd = (&self.y & BigUint::one()) == BigUint::one();
        out.push(if y_is_odd { 0x03 } else { 0x02 });
        out.extend_from_slice(&to_bytes_32(&self.x));
        out
    }

    /// Serialize in the 65-byte uncompressed form.
    ///
    /// # Returns
    /// `0x04 || X || Y`.
    pub fn to_uncompressed(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(65);
        out.push(0x04);
        out.extend_from_slice(&to_bytes_32(&self.x));
        out.extend_from_slice(&to_bytes_32(&self.y));
        out
    }

    /// Whether `to_bytes` produces the compressed form.
    pub fn compressed(&self) -> bool {
        self.compressed
    }

    /// Compute the Hash160 of the preferred encoding.
    ///
    /// This is the 20-byte hash a P2PKH output commits to; it differs
    /// between the compressed and uncompressed renditions of the same
    /// point.
    ///
    /// # Returns
    /// A 20-byte Hash160 digest.
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.to_bytes())
    }

    /// Verify an ECDSA signature over a 32-byte digest.
    ///
    /// # Arguments
    /// * `digest` - The 32-byte message digest.
    /// * `signature` - The signature to check.
    ///
    /// # Returns
    /// `true` if the signature is valid under this key.
    pub fn verify(&self, digest: &[u8; 32], signature: &Signature) -> bool {
        signature.verify(digest, self)
    }

    /// The underlying curve point.
    pub(crate) fn point(&self) -> Point {
        Point::Affine {
            x: self.x.clone(),
            y: self.y.clone(),
        }
    }
}
