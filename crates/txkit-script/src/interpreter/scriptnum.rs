//! Script number arithmetic with Bitcoin consensus rules.
//!
//! All numbers on the Bitcoin script stack are encoded as little-endian
//! byte arrays with a sign bit in the most significant bit of the last
//! byte. Numeric opcodes accept at most 4-byte operands, but results may
//! grow wider and remain valid as long as they are not reinterpreted as
//! numbers.

use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::error::{InterpreterError, InterpreterErrorCode};

/// A script number using big integer arithmetic for overflow safety.
#[derive(Debug, Clone)]
pub struct ScriptNumber {
    /// The numeric value stored as a big integer.
    pub val: BigInt,
}

impl ScriptNumber {
    /// Create a new ScriptNumber from an i64 value.
    pub fn new(val: i64) -> Self {
        ScriptNumber {
            val: BigInt::from(val),
        }
    }

    /// Parse a byte array into a ScriptNumber.
    ///
    /// `max_len` is the maximum allowed byte length of the operand
    /// (4 for arithmetic opcodes).
    pub fn from_bytes(bb: &[u8], max_len: usize) -> Result<Self, InterpreterError> {
        if bb.len() > max_len {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooBig,
                format!(
                    "numeric value encoded as {:02x?} is {} bytes which exceeds the max allowed of {}",
                    bb,
                    bb.len(),
                    max_len
                ),
            ));
        }

        if bb.is_empty() {
            return Ok(ScriptNumber { val: BigInt::zero() });
        }

        // Decode from little endian with sign bit.
        let mut v = BigInt::zero();
        for (i, &b) in bb.iter().enumerate() {
            v |= BigInt::from(b) << (8 * i);
        }

        // If the most significant byte has the sign bit set, the number
        // is negative.
        if bb[bb.len() - 1] & 0x80 != 0 {
            let mask = !(BigInt::from(0x80_i64) << (8 * (bb.len() - 1)));
            v &= mask;
            v = -v;
        }

        Ok(ScriptNumber { val: v })
    }

    /// Serialize the number to bytes in little-endian with sign bit.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.val.is_zero() {
            return vec![];
        }

        let is_negative = self.val.is_negative();
        let abs_val = self.val.abs();

        // Convert absolute value to little-endian bytes.
        let mut result: Vec<u8> = Vec::new();
        let mut cpy = abs_val;
        while cpy > BigInt::zero() {
            result.push((&cpy & BigInt::from(0xff_u8)).to_u8().unwrap_or(0));
            cpy >>= 8;
        }

        // Handle sign bit.
        if result[result.len() - 1] & 0x80 != 0 {
            // Need an extra byte for the sign.
            result.push(if is_negative { 0x80 } else { 0x00 });
        } else if is_negative {
            let last = result.len() - 1;
            result[last] |= 0x80;
        }

        result
    }

    // Arithmetic operations (mutating, return self for chaining)

    /// Add another script number to this one.
    pub fn add(&mut self, other: &ScriptNumber) -> &mut Self {
        self.val = &self.val + &other.val;
        self
    }

    /// Subtract another script number from this one.
    pub fn sub(&mut self, other: &ScriptNumber) -> &mut Self {
        self.val = &self.val - &other.val;
        self
    }

    /// Increment this number by one.
    pub fn incr(&mut self) -> &mut Self {
        self.val = &self.val + BigInt::one();
        self
    }

    /// Decrement this number by one.
    pub fn decr(&mut self) -> &mut Self {
        self.val = &self.val - BigInt::one();
        self
    }

    /// Negate this number.
    pub fn neg(&mut self) -> &mut Self {
        self.val = -self.val.clone();
        self
    }

    /// Replace this number with its absolute value.
    pub fn abs(&mut self) -> &mut Self {
        if self.val.is_negative() {
            self.val = -self.val.clone();
        }
        self
    }

    /// Set this number to the given i64 value.
    pub fn set(&mut self, i: i64) -> &mut Self {
        self.val = BigInt::from(i);
        self
    }

    // Comparison operations

    /// Return true if this number is zero.
    pub fn is_zero(&self) -> bool {
        self.val.is_zero()
    }

    /// Return true if this number is less than `other`.
    pub fn less_than(&self, other: &ScriptNumber) -> bool {
        self.val < other.val
    }

    /// Return true if this number is less than or equal to `other`.
    pub fn less_than_or_equal(&self, other: &ScriptNumber) -> bool {
        self.val <= other.val
    }

    /// Return true if this number is greater than `other`.
    pub fn greater_than(&self, other: &ScriptNumber) -> bool {
        self.val > other.val
    }

    /// Return true if this number is greater than or equal to `other`.
    pub fn greater_than_or_equal(&self, other: &ScriptNumber) -> bool {
        self.val >= other.val
    }

    /// Return true if this number is equal to `other`.
    pub fn equal(&self, other: &ScriptNumber) -> bool {
        self.val == other.val
    }

    // Conversion

    /// Convert to i32, clamping to [i32::MIN, i32::MAX] on overflow.
    pub fn to_i32(&self) -> i32 {
        match self.val.to_i64() {
            Some(v) => {
                if v > i32::MAX as i64 {
                    i32::MAX
                } else if v < i32::MIN as i64 {
                    i32::MIN
                } else {
                    v as i32
                }
            }
            None => {
                if self.val.is_positive() {
                    i32::MAX
                } else {
                    i32::MIN
                }
            }
        }
    }

    /// Convert to i64, returning 0 if the value does not fit.
    pub fn to_int(&self) -> i64 {
        self.val.to_i64().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_to_bytes(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    #[test]
    fn test_script_num_bytes() {
        let tests: Vec<(i64, Vec<u8>)> = vec![
            (0, vec![]),
            (1, hex_to_bytes("01")),
            (-1, hex_to_bytes("81")),
            (127, hex_to_bytes("7f")),
            (-127, hex_to_bytes("ff")),
            (128, hex_to_bytes("8000")),
            (-128, hex_to_bytes("8080")),
            (129, hex_to_bytes("8100")),
            (-129, hex_to_bytes("8180")),
            (256, hex_to_bytes("0001")),
            (-256, hex_to_bytes("0081")),
            (32767, hex_to_bytes("ff7f")),
            (-32767, hex_to_bytes("ffff")),
            (32768, hex_to_bytes("008000")),
            (-32768, hex_to_bytes("008080")),
            (65535, hex_to_bytes("ffff00")),
            (-65535, hex_to_bytes("ffff80")),
            (8388608, hex_to_bytes("00008000")),
            (-8388608, hex_to_bytes("00008080")),
            (2147483647, hex_to_bytes("ffffff7f")),
            (-2147483647, hex_to_bytes("ffffffff")),
            // Out of range values (still valid for results)
            (2147483648, hex_to_bytes("0000008000")),
            (-2147483648, hex_to_bytes("0000008080")),
            (4294967295, hex_to_bytes("ffffffff00")),
            (-4294967295, hex_to_bytes("ffffffff80")),
        ];

        for (num, expected) in &tests {
            let sn = ScriptNumber::new(*num);
            let got = sn.to_bytes();
            assert_eq!(
                &got, expected,
                "Bytes: num={}, got={:02x?}, want={:02x?}",
                num, got, expected
            );
        }
    }

    #[test]
    fn test_from_bytes_roundtrip() {
        for num in [-70000i64, -128, -1, 0, 1, 127, 128, 255, 256, 70000] {
            let bytes = ScriptNumber::new(num).to_bytes();
            let back = ScriptNumber::from_bytes(&bytes, 5).unwrap();
            assert_eq!(back.to_int(), num, "roundtrip failed for {}", num);
        }
    }

    #[test]
    fn test_from_bytes_length_limit() {
        // 5-byte operands are rejected at the 4-byte limit.
        assert!(ScriptNumber::from_bytes(&hex_to_bytes("0000008000"), 4).is_err());
        assert!(ScriptNumber::from_bytes(&hex_to_bytes("0000008000"), 5).is_ok());
    }

    /// Non-minimal encodings still parse; script numbers only restrict
    /// operand length.
    #[test]
    fn test_from_bytes_non_minimal() {
        assert_eq!(ScriptNumber::from_bytes(&hex_to_bytes("00"), 4).unwrap().to_int(), 0);
        assert_eq!(ScriptNumber::from_bytes(&hex_to_bytes("0100"), 4).unwrap().to_int(), 1);
        // Negative zero parses to zero.
        assert_eq!(ScriptNumber::from_bytes(&hex_to_bytes("80"), 4).unwrap().to_int(), 0);
    }

    #[test]
    fn test_to_i32_clamping() {
        assert_eq!(ScriptNumber::new(2147483648).to_i32(), i32::MAX);
        assert_eq!(ScriptNumber::new(-2147483649).to_i32(), i32::MIN);
        assert_eq!(ScriptNumber::new(-5).to_i32(), -5);
    }
}
