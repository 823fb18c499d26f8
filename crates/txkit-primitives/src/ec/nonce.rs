//! RFC6979 deterministic nonce generation.
//!
//! Derives ECDSA nonces from the private scalar and message digest with
//! HMAC-SHA256 so that signing is a pure function: the same key and
//! digest always produce the same signature.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::hash::sha256_hmac;

use super::curve::to_bytes_32;

/// Stateful RFC6979 candidate generator (HMAC-SHA256 variant).
///
/// `next_nonce` yields successive candidates in `[1, n-1]`; the caller
/// retries when a candidate leads to `r == 0` or `s == 0`.
pub(crate) struct NonceGenerator {
    k: [u8; 32],
    v: [u8; 32],
    order: BigUint,
    primed: bool,
}

impl NonceGenerator {
    /// Seed the generator from the private scalar and message digest.
    ///
    /// Implements steps b-f of RFC6979 section 3.2, including the
    /// bits2octets reduction of the digest modulo the group order.
    ///
    /// # Arguments
    /// * `secret` - The private scalar, 32 bytes big-endian.
    /// * `digest` - The 32-byte message digest.
    /// * `order` - The group order n.
    ///
    /// # Returns
    /// A generator ready to produce candidates.
    pub fn new(secret: &[u8; 32], digest: &[u8; 32], order: &BigUint) -> Self {
        // bits2octets(h1): interpret as an integer, reduce mod n, re-encode.
        let z = BigUint::from_bytes_be(digest) % order;
        let h1 = to_bytes_32(&z);

        let mut k = [0u8; 32];
        let mut v = [1u8; 32];

        k = hmac_with_suffix(&k, &v, 0x00, secret, &h1);
        v = sha256_hmac(&k, &v);
        k = hmac_with_suffix(&k, &v, 0x01, secret, &h1);
        v = sha256_hmac(&k, &v);

        NonceGenerator {
            k,
            v,
            order: order.clone(),
            primed: false,
        }
    }

    /// Produce the next candidate nonce in `[1, n-1]`.
    ///
    /// The first call yields the primary RFC6979 nonce; subsequent calls
    /// perform the retry step (step h.3) before generating a new
    /// candidate.
    ///
    /// # Returns
    /// A scalar in `[1, n-1]`.
    pub fn next_nonce(&mut self) -> BigUint {
        loop {
            if self.primed {
                self.retry_step();
            }
            self.primed = true;

            self.v = sha256_hmac(&self.k, &self.v);
            let candidate = BigUint::from_bytes_be(&self.v);
            if !candidate.is_zero() && candidate < self.order {
                return candidate;
            }
        }
    }

    /// Step h.3: re-key after a rejected candidate.
    fn retry_step(&mut self) {
        let mut data = Vec::with_capacity(33);
        data.extend_from_slice(&self.v);
        data.push(0x00);
        self.k = sha256_hmac(&self.k, &data);
        self.v = sha256_hmac(&self.k, &self.v);
    }
}

/// HMAC over `v || suffix || secret || digest` with key `k`.
fn hmac_with_suffix(
    k: &[u8; 32],
    v: &[u8; 32],
    suffix: u8,
    secret: &[u8; 32],
    digest: &[u8; 32],
) -> [u8; 32] {
    let mut data = Vec::with_capacity(32 + 1 + 32 + 32);
    data.extend_from_slice(v);
    data.push(suffix);
    data.extend_from_slice(secret);
    data.extend_from_slice(digest);
    sha256_hmac(k, &data)
}
