//! 64-bit integer emulation on top of two 32-bit words.
//!
//! The host cannot represent a 64-bit integer exactly (its only numeric type is a double), so
//! compiled code carries every `i64` as a `(low, high)` pair of unsigned 32-bit words whose
//! value is `low + high * 2^32`. This module provides the operations that cannot be expressed
//! as independent word operations:
//!
//! - [`Int64::shift`] - shifts with cross-word carry and sign extension, bit-exact with
//!   two's complement arithmetic
//! - [`bitwise_combine`] - `or`/`and`/`xor` on double-approximated 64-bit values
//! - [`combine_to_approx`] - collapse a word pair into a single (possibly rounded) double
//!
//! # Precision
//!
//! [`bitwise_combine`] and [`combine_to_approx`] work on doubles and are therefore exact only
//! while the value fits in 53 bits. Larger operands are rounded. This is an accepted
//! approximation of the surrounding code generator, which only routes values through these
//! helpers when it cannot carry exact words.

use strum::{Display, EnumIter};

use crate::{
    numeric::sign::{round_half_up, to_int32, TWO_POW_32},
    Error, Result,
};

/// Shift operation applied by [`Int64::shift`].
///
/// The discriminants match the numbering used by generated code, so a raw operation code can
/// be converted with `ShiftOp::try_from(code)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
#[repr(u8)]
pub enum ShiftOp {
    /// `shl` - shift left, zero fill.
    ShiftLeft = 0,
    /// `ashr` - arithmetic shift right, sign fill.
    ArithShiftRight = 1,
    /// `lshr` - logical shift right, zero fill.
    LogicalShiftRight = 2,
}

impl TryFrom<u8> for ShiftOp {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ShiftOp::ShiftLeft),
            1 => Ok(ShiftOp::ArithShiftRight),
            2 => Ok(ShiftOp::LogicalShiftRight),
            other => Err(assertion_error!("unknown 64-bit shift operation {}", other)),
        }
    }
}

/// Bitwise operation applied by [`bitwise_combine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum BitwiseOp {
    /// Bitwise or.
    Or,
    /// Bitwise and.
    And,
    /// Bitwise exclusive or.
    Xor,
}

impl BitwiseOp {
    #[inline]
    fn apply(self, a: i32, b: i32) -> i32 {
        match self {
            BitwiseOp::Or => a | b,
            BitwiseOp::And => a & b,
            BitwiseOp::Xor => a ^ b,
        }
    }
}

/// A 64-bit integer held as two 32-bit words.
///
/// The value is `low + high * 2^32`; whether `high` is read as signed is decided by each
/// operation. `Int64` has no identity of its own: it is built, combined and taken apart in
/// place by the caller.
///
/// # Examples
///
/// ```rust
/// use memrt::numeric::{Int64, ShiftOp};
///
/// let value = Int64::new(0x1, 0x0);
/// let shifted = value.shift(ShiftOp::ShiftLeft, 33)?;
/// assert_eq!(shifted, Int64::new(0x0, 0x2));
/// # Ok::<(), memrt::Error>(())
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Int64 {
    /// Low 32 bits.
    pub low: u32,
    /// High 32 bits.
    pub high: u32,
}

impl Int64 {
    /// Creates a value from its two words.
    #[must_use]
    pub const fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }

    /// Splits a native signed integer into words.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn from_i64(value: i64) -> Self {
        Self::from_u64(value as u64)
    }

    /// Splits a native unsigned integer into words.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_u64(value: u64) -> Self {
        Self {
            low: value as u32,
            high: (value >> 32) as u32,
        }
    }

    /// Joins the words into a native unsigned integer.
    #[must_use]
    pub const fn to_u64(self) -> u64 {
        ((self.high as u64) << 32) | self.low as u64
    }

    /// Joins the words into a native signed integer.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn to_i64(self) -> i64 {
        self.to_u64() as i64
    }

    /// Returns `true` if the sign bit (bit 63) is set.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.high & 0x8000_0000 != 0
    }

    /// Shifts the value by `bits` (`0..=63`).
    ///
    /// Three regimes are handled separately: shifts below 32 carry bits between the words,
    /// a shift of exactly 32 moves one word into the other, and larger shifts only operate on
    /// the word that survives. Arithmetic right shifts replicate bit 63.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidShift`] if `bits` is 64 or larger.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    pub fn shift(self, op: ShiftOp, bits: u32) -> Result<Self> {
        if bits > 63 {
            return Err(Error::InvalidShift(bits));
        }

        let Int64 { low, high } = self;
        let sign_fill = if (high as i32) < 0 { u32::MAX } else { 0 };

        let result = match bits {
            0 => self,
            1..=31 => {
                let carry = 32 - bits;
                match op {
                    ShiftOp::ShiftLeft => Int64::new(low << bits, (high << bits) | (low >> carry)),
                    ShiftOp::ArithShiftRight => Int64::new(
                        (low >> bits) | (high << carry),
                        ((high as i32) >> bits) as u32,
                    ),
                    ShiftOp::LogicalShiftRight => {
                        Int64::new((low >> bits) | (high << carry), high >> bits)
                    }
                }
            }
            32 => match op {
                ShiftOp::ShiftLeft => Int64::new(0, low),
                ShiftOp::ArithShiftRight => Int64::new(high, sign_fill),
                ShiftOp::LogicalShiftRight => Int64::new(high, 0),
            },
            _ => {
                let rest = bits - 32;
                match op {
                    ShiftOp::ShiftLeft => Int64::new(0, low << rest),
                    ShiftOp::ArithShiftRight => {
                        Int64::new(((high as i32) >> rest) as u32, sign_fill)
                    }
                    ShiftOp::LogicalShiftRight => Int64::new(high >> rest, 0),
                }
            }
        };

        Ok(result)
    }

    /// Collapses the pair into a double; see [`combine_to_approx`].
    #[must_use]
    pub fn to_approx(self, unsigned: bool) -> f64 {
        combine_to_approx(self.low, self.high, unsigned)
    }
}

impl From<i64> for Int64 {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl From<u64> for Int64 {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<Int64> for i64 {
    fn from(value: Int64) -> Self {
        value.to_i64()
    }
}

/// Shifts a `(low, high)` word pair; see [`Int64::shift`].
///
/// # Errors
///
/// Returns [`Error::InvalidShift`] if `bits` is 64 or larger.
pub fn shift(low: u32, high: u32, op: ShiftOp, bits: u32) -> Result<Int64> {
    Int64::new(low, high).shift(op, bits)
}

/// Applies `or`, `and` or `xor` to two double-approximated 64-bit values.
///
/// Each operand is split into an exact low contribution (its 32-bit truncation) and an
/// approximate high contribution (`round(value / 2^32)` truncated to 32 bits). The halves are
/// combined with the native operator and recomposed as `low + high * 2^32`.
///
/// Operands whose high word needs more than 21 significant bits lose precision. The rounding
/// is part of the contract and must not be replaced by exact 64-bit arithmetic.
///
/// # Examples
///
/// ```rust
/// use memrt::numeric::{bitwise_combine, BitwiseOp};
///
/// assert_eq!(bitwise_combine(1.0, 2.0, BitwiseOp::Or), 3.0);
/// assert_eq!(bitwise_combine(4_294_967_297.0, 1.0, BitwiseOp::And), 1.0);
/// assert_eq!(bitwise_combine(-1.0, 0.0, BitwiseOp::Or), -1.0);
/// ```
#[must_use]
pub fn bitwise_combine(x: f64, y: f64, op: BitwiseOp) -> f64 {
    let low = op.apply(to_int32(x), to_int32(y));
    let high = op.apply(
        to_int32(round_half_up(x / TWO_POW_32)),
        to_int32(round_half_up(y / TWO_POW_32)),
    );
    f64::from(low) + f64::from(high) * TWO_POW_32
}

/// Produces a single double from a word pair.
///
/// With `unsigned` set the high word is read as unsigned, otherwise it is reinterpreted as
/// two's complement before it is scaled by 2^32. The low word is always unsigned. Small
/// negative values such as `-1` therefore come out exactly, while magnitudes beyond 2^53 are
/// rounded.
///
/// ```rust
/// use memrt::numeric::combine_to_approx;
///
/// assert_eq!(combine_to_approx(0xFFFF_FFFF, 0xFFFF_FFFF, false), -1.0);
/// assert_eq!(combine_to_approx(5, 1, true), 4_294_967_301.0);
/// ```
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn combine_to_approx(low: u32, high: u32, unsigned: bool) -> f64 {
    let high = if unsigned {
        f64::from(high)
    } else {
        f64::from(high as i32)
    };
    f64::from(low) + high * TWO_POW_32
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn reference(value: u64, op: ShiftOp, bits: u32) -> u64 {
        match op {
            ShiftOp::ShiftLeft => value << bits,
            ShiftOp::ArithShiftRight => ((value as i64) >> bits) as u64,
            ShiftOp::LogicalShiftRight => value >> bits,
        }
    }

    #[test]
    fn test_shift_matches_native_arithmetic() {
        let samples = [
            0u64,
            1,
            0xFFFF_FFFF,
            0x1_0000_0000,
            0x8000_0000_0000_0000,
            0xFFFF_FFFF_FFFF_FFFF,
            0x1234_5678_9ABC_DEF0,
            0xF0F0_0000_0F0F_FFFF,
            0x7FFF_FFFF_FFFF_FFFF,
        ];

        for value in samples {
            for op in ShiftOp::iter() {
                for bits in [0u32, 1, 31, 32, 33, 63] {
                    let words = Int64::from_u64(value);
                    let got = words.shift(op, bits).unwrap();
                    assert_eq!(
                        got.to_u64(),
                        reference(value, op, bits),
                        "{op} of 0x{value:016x} by {bits}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_shift_all_amounts() {
        let value = 0x8765_4321_0FED_CBA9u64;
        for op in ShiftOp::iter() {
            for bits in 0..64 {
                let got = shift(value as u32, (value >> 32) as u32, op, bits).unwrap();
                assert_eq!(got.to_u64(), reference(value, op, bits));
            }
        }
    }

    #[test]
    fn test_shift_left_33() {
        assert_eq!(
            shift(0x1, 0x0, ShiftOp::ShiftLeft, 33).unwrap(),
            Int64::new(0x0, 0x2)
        );
    }

    #[test]
    fn test_shift_word_swap() {
        let v = Int64::new(0xAAAA_BBBB, 0x8000_0001);
        assert_eq!(v.shift(ShiftOp::ShiftLeft, 32).unwrap(), Int64::new(0, 0xAAAA_BBBB));
        assert_eq!(v.shift(ShiftOp::LogicalShiftRight, 32).unwrap(), Int64::new(0x8000_0001, 0));
        assert_eq!(
            v.shift(ShiftOp::ArithShiftRight, 32).unwrap(),
            Int64::new(0x8000_0001, 0xFFFF_FFFF)
        );
    }

    #[test]
    fn test_shift_out_of_range() {
        assert!(matches!(
            Int64::new(1, 0).shift(ShiftOp::ShiftLeft, 64),
            Err(Error::InvalidShift(64))
        ));
    }

    #[test]
    fn test_shift_op_codes() {
        assert_eq!(ShiftOp::try_from(0).unwrap(), ShiftOp::ShiftLeft);
        assert_eq!(ShiftOp::try_from(1).unwrap(), ShiftOp::ArithShiftRight);
        assert_eq!(ShiftOp::try_from(2).unwrap(), ShiftOp::LogicalShiftRight);
        assert!(ShiftOp::try_from(3).is_err());
    }

    #[test]
    fn test_word_conversions() {
        let v = Int64::from_i64(-2);
        assert_eq!(v, Int64::new(0xFFFF_FFFE, 0xFFFF_FFFF));
        assert!(v.is_negative());
        assert_eq!(v.to_i64(), -2);
        assert_eq!(i64::from(Int64::from(42i64)), 42);
    }

    #[test]
    fn test_bitwise_combine_small_values_are_exact() {
        for (x, y) in [(0i64, 0i64), (5, 3), (-1, 7), (1 << 40, 1 << 33), (-(1 << 35), 12345)] {
            let (fx, fy) = (x as f64, y as f64);
            assert_eq!(bitwise_combine(fx, fy, BitwiseOp::Or), (x | y) as f64, "{x} | {y}");
            assert_eq!(bitwise_combine(fx, fy, BitwiseOp::And), (x & y) as f64, "{x} & {y}");
            assert_eq!(bitwise_combine(fx, fy, BitwiseOp::Xor), (x ^ y) as f64, "{x} ^ {y}");
        }
    }

    #[test]
    fn test_bitwise_combine_high_word() {
        let x = 3.0 * TWO_POW_32 + 1.0;
        let y = 5.0 * TWO_POW_32 + 2.0;
        assert_eq!(bitwise_combine(x, y, BitwiseOp::Or), 7.0 * TWO_POW_32 + 3.0);
        assert_eq!(bitwise_combine(x, y, BitwiseOp::And), TWO_POW_32);
        assert_eq!(bitwise_combine(x, y, BitwiseOp::Xor), 6.0 * TWO_POW_32 + 3.0);
    }

    #[test]
    fn test_combine_to_approx() {
        assert_eq!(combine_to_approx(0, 0, false), 0.0);
        assert_eq!(combine_to_approx(0xFFFF_FFFF, 0, false), 4_294_967_295.0);
        assert_eq!(combine_to_approx(0, 0xFFFF_FFFF, true), 0xFFFF_FFFFu64 as f64 * TWO_POW_32);
        assert_eq!(combine_to_approx(0, 0x8000_0000, false), i64::MIN as f64);
        assert_eq!(Int64::from_i64(-12345).to_approx(false), -12345.0);
    }
}
