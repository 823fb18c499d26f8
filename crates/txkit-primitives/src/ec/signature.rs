//! ECDSA signature with DER serialization and RFC6979 deterministic nonces.
//!
//! Signing follows the textbook ECDSA equations over the in-crate
//! secp256k1 arithmetic, with the nonce derived per RFC6979 and the S
//! component normalized to the lower half of the group order. DER
//! serialization is strict on output; parsing is tolerant enough to
//! accept historical on-chain encodings.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::PrimitivesError;

use super::curve::{mod_inverse, Curve};
use super::nonce::NonceGenerator;
use super::private_key::PrivateKey;
use super::public_key::PublicKey;

/// An ECDSA signature with R and S components.
///
/// Provides DER serialization, RFC6979 deterministic signing, and
/// low-S normalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// The R component of the signature.
    r: BigUint,
    /// The S component of the signature.
    s: BigUint,
}

impl Signature {
    /// Create a signature from raw R and S values.
    ///
    /// # Arguments
    /// * `r` - The R component.
    /// * `s` - The S component.
    ///
    /// # Returns
    /// A new `Signature` with the given R and S values.
    pub fn new(r: BigUint, s: BigUint) -> Self {
        Signature { r, s }
    }

    /// Access the R component of the signature.
    pub fn r(&self) -> &BigUint {
        &self.r
    }

    /// Access the S component of the signature.
    pub fn s(&self) -> &BigUint {
        &self.s
    }

    /// Sign a 32-byte message digest with RFC6979 deterministic nonces.
    ///
    /// Textbook ECDSA: derive `k` from `(d, e)`, compute
    /// `R = k*G`, `r = R.x mod n`, `s = k^-1 (e + r*d) mod n`, retrying
    /// on zero `r` or `s`, then normalize `s` to the lower half of the
    /// order. The same key and digest always produce the same bytes.
    ///
    /// # Arguments
    /// * `digest` - The 32-byte message digest to sign.
    /// * `priv_key` - The private key to sign with.
    ///
    /// # Returns
    /// `Ok(Signature)` with a low-S normalized signature.
    pub fn sign(digest: &[u8; 32], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        let curve = Curve::secp256k1();
        let d = priv_key.scalar();
        let e = BigUint::from_bytes_be(digest) % &curve.n;

        let mut nonce = NonceGenerator::new(&priv_key.to_bytes(), digest, &curve.n);
        loop {
            let k = nonce.next_nonce();
            let r_point = curve.mul_g(&k);
            let x = match r_point.x() {
                Some(x) => x.clone(),
                None => continue,
            };
            let r = x % &curve.n;
            if r.is_zero() {
                continue;
            }

            let k_inv = mod_inverse(&k, &curve.n);
            let mut s = (&k_inv * ((&e + (&r * &d) % &curve.n) % &curve.n)) % &curve.n;
            if s.is_zero() {
                continue;
            }

            let half_order = &curve.n >> 1;
            if s > half_order {
                s = &curve.n - s;
            }

            return Ok(Signature { r, s });
        }
    }

    /// Verify this signature against a message digest and public key.
    ///
    /// Computes `w = s^-1 mod n`, `u1 = e*w`, `u2 = r*w`,
    /// `P = u1*G + u2*Q` and accepts iff `P` is not the identity and
    /// `P.x mod n == r`.
    ///
    /// # Arguments
    /// * `digest` - The 32-byte message digest that was signed.
    /// * `pub_key` - The public key to verify against.
    ///
    /// # Returns
    /// `true` if the signature is valid, `false` otherwise.
    pub fn verify(&self, digest: &[u8; 32], pub_key: &PublicKey) -> bool {
        let curve = Curve::secp256k1();

        if self.r.is_zero() || self.r >= curve.n || self.s.is_zero() || self.s >= curve.n {
            return false;
        }

        let e = BigUint::from_bytes_be(digest) % &curve.n;
        let w = mod_inverse(&self.s, &curve.n);
        let u1 = (&e * &w) % &curve.n;
        let u2 = (&self.r * &w) % &curve.n;

        let q = pub_key.point();
        let p = curve.add(&curve.mul_g(&u1), &curve.mul(&u2, &q));

        match p.x() {
            None => false,
            Some(x) => (x % &curve.n) == self.r,
        }
    }

    /// Serialize the signature in DER format with low-S normalization.
    ///
    /// Output format: `0x30 <len> 0x02 <r_len> <r> 0x02 <s_len> <s>`
    /// with both integers minimally encoded and zero-padded only when
    /// the high bit is set (two's-complement safety). An S value above
    /// half the group order is replaced by `n - s`.
    ///
    /// # Returns
    /// A byte vector containing the DER-encoded signature.
    pub fn to_der(&self) -> Vec<u8> {
        let curve = Curve::secp256k1();
        let half_order = &curve.n >> 1;
        let s = if self.s > half_order {
            &curve.n - &self.s
        } else {
            self.s.clone()
        };

        let rb = canonicalize_int(&self.r);
        let sb = canonicalize_int(&s);

        let total_len = 6 + rb.len() + sb.len();
        let mut out = Vec::with_capacity(total_len);
        out.push(0x30);
        out.push((total_len - 2) as u8);
        out.push(0x02);
        out.push(rb.len() as u8);
        out.extend_from_slice(&rb);
        out.push(0x02);
        out.push(sb.len() as u8);
        out.extend_from_slice(&sb);
        out
    }

    /// Parse a DER-encoded ECDSA signature.
    ///
    /// Expected format: `0x30 <len> 0x02 <r_len> <r> 0x02 <s_len> <s>`.
    /// Parsing is tolerant of the padding variations found in historical
    /// on-chain signatures, but R and S must both lie in `[1, n-1]`.
    ///
    /// # Arguments
    /// * `bytes` - DER-encoded signature bytes.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or an error if the encoding is
    /// malformed or a component is out of range.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() < 8 {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: too short".to_string(),
            ));
        }

        if bytes[0] != 0x30 {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: no header magic".to_string(),
            ));
        }

        let sig_len = bytes[1] as usize;
        if sig_len + 2 > bytes.len() || sig_len + 2 < 8 {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: bad length".to_string(),
            ));
        }

        let data = &bytes[..sig_len + 2];
        let mut idx = 2;

        // Parse R
        if data[idx] != 0x02 {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: no 1st int marker".to_string(),
            ));
        }
        idx += 1;
        let r_len = data[idx] as usize;
        idx += 1;
        if r_len == 0 || idx + r_len > data.len() - 3 {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: bogus R length".to_string(),
            ));
        }
        let r_bytes = &data[idx..idx + r_len];
        idx += r_len;

        // Parse S
        if data[idx] != 0x02 {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: no 2nd int marker".to_string(),
            ));
        }
        idx += 1;
        let s_len = data[idx] as usize;
        idx += 1;
        if s_len == 0 || idx + s_len > data.len() {
            return Err(PrimitivesError::InvalidSignature(
                "malformed signature: bogus S length".to_string(),
            ));
        }
        let s_bytes = &data[idx..idx + s_len];

        let r = BigUint::from_bytes_be(r_bytes);
        let s = BigUint::from_bytes_be(s_bytes);

        let curve = Curve::secp256k1();
        if r.is_zero() {
            return Err(PrimitivesError::InvalidSignature(
                "signature R is zero".to_string(),
            ));
        }
        if s.is_zero() {
            return Err(PrimitivesError::InvalidSignature(
                "signature S is zero".to_string(),
            ));
        }
        if r >= curve.n {
            return Err(PrimitivesError::InvalidSignature(
                "signature R is >= curve order".to_string(),
            ));
        }
        if s >= curve.n {
            return Err(PrimitivesError::InvalidSignature(
                "signature S is >= curve order".to_string(),
            ));
        }

        Ok(Signature { r, s })
    }
}

/// Canonicalize an integer for DER encoding.
///
/// Produces the minimal big-endian representation with a leading zero
/// byte when the high bit is set, so the value cannot be read back as
/// negative.
///
/// # Arguments
/// * `val` - The integer to encode.
///
/// # Returns
/// A byte vector suitable for DER integer encoding.
fn canonicalize_int(val: &BigUint) -> Vec<u8> {
    if val.is_zero() {
        return vec![0x00];
    }
    let bytes = val.to_bytes_be();
    if bytes[0] & 0x80 != 0 {
        let mut out = Vec::with_capacity(bytes.len() + 1);
        out.push(0x00);
        out.extend_from_slice(&bytes);
        out
    } else {
        bytes
    }
}
