//! Signed/unsigned reinterpretation for arbitrary bit widths up to 64.
//!
//! Values coming out of linear memory carry no signedness; the compiled program decides per
//! operation whether a word is read as signed or unsigned. [`to_unsigned`] and [`to_signed`]
//! perform that reinterpretation for any width in `1..=64` using exact integer arithmetic, so
//! a round-trip through both is lossless for every representable value.
//!
//! In [`SignCheck::Strict`] mode a conversion that would change the numeric value is reported
//! as [`Error::SignConversion`] instead of being carried out. This is used in contexts where
//! a negative (or out-of-half-range) value is already known to be a bug.

use crate::{Error, Result};

/// 2^32 as a float, the scale factor between the two words of an emulated 64-bit value.
pub const TWO_POW_32: f64 = 4_294_967_296.0;

/// How sign conversions treat values that need to be reinterpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SignCheck {
    /// Reinterpret silently (two's complement wrap).
    #[default]
    Wrap,
    /// Fail with [`Error::SignConversion`] whenever the value would change.
    Strict,
}

impl SignCheck {
    /// Selects [`SignCheck::Strict`] when `strict` is set.
    #[must_use]
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            SignCheck::Strict
        } else {
            SignCheck::Wrap
        }
    }
}

fn check_width(bits: u32) -> Result<()> {
    if bits == 0 || bits > 64 {
        return Err(Error::InvalidBitWidth(bits));
    }
    Ok(())
}

/// Reinterprets a signed value as an unsigned `bits`-wide value.
///
/// Non-negative values are returned unchanged. Negative values have `2^bits` added, so `-1`
/// becomes the all-ones pattern of the requested width.
///
/// # Errors
///
/// - [`Error::InvalidBitWidth`] if `bits` is outside `1..=64`
/// - [`Error::SignConversion`] for negative input in [`SignCheck::Strict`] mode
///
/// # Examples
///
/// ```rust
/// use memrt::numeric::{to_unsigned, SignCheck};
///
/// assert_eq!(to_unsigned(-1, 8, SignCheck::Wrap)?, 255);
/// assert_eq!(to_unsigned(-1, 32, SignCheck::Wrap)?, 0xFFFF_FFFF);
/// assert_eq!(to_unsigned(-1, 64, SignCheck::Wrap)?, u64::MAX);
/// assert!(to_unsigned(-1, 32, SignCheck::Strict).is_err());
/// # Ok::<(), memrt::Error>(())
/// ```
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub fn to_unsigned(value: i64, bits: u32, check: SignCheck) -> Result<u64> {
    check_width(bits)?;
    if value >= 0 {
        return Ok(value as u64);
    }
    if check == SignCheck::Strict {
        return Err(Error::SignConversion {
            value: i128::from(value),
            bits,
        });
    }

    // Values below -2^bits wrap modulo 2^64, mirroring a plain register truncation.
    Ok(((1i128 << bits) + i128::from(value)) as u64)
}

/// Reinterprets an unsigned `bits`-wide value as signed.
///
/// Values below the half range `2^(bits-1)` are returned unchanged, everything else has
/// `2^bits` subtracted.
///
/// # Errors
///
/// - [`Error::InvalidBitWidth`] if `bits` is outside `1..=64`
/// - [`Error::SignConversion`] in [`SignCheck::Strict`] mode if the value would change, or if
///   the result does not fit an `i64`
///
/// # Examples
///
/// ```rust
/// use memrt::numeric::{to_signed, SignCheck};
///
/// assert_eq!(to_signed(200, 8, SignCheck::Wrap)?, -56);
/// assert_eq!(to_signed(0xFFFF_FFFF, 32, SignCheck::Wrap)?, -1);
/// assert_eq!(to_signed(100, 8, SignCheck::Strict)?, 100);
/// assert!(to_signed(200, 8, SignCheck::Strict).is_err());
/// # Ok::<(), memrt::Error>(())
/// ```
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn to_signed(value: u64, bits: u32, check: SignCheck) -> Result<i64> {
    check_width(bits)?;
    let half = 1u128 << (bits - 1);
    let wide = u128::from(value);

    let reduced = if wide < half {
        i128::from(value)
    } else {
        if check == SignCheck::Strict {
            return Err(Error::SignConversion {
                value: i128::from(value),
                bits,
            });
        }
        i128::from(value) - (1i128 << bits)
    };

    let result = i64::try_from(reduced).map_err(|_| Error::SignConversion {
        value: i128::from(value),
        bits,
    })?;

    // A 32-bit result must agree with the native truncation of the same bits.
    if check == SignCheck::Strict && bits == 32 && result != i64::from(value as u32 as i32) {
        return Err(Error::SignConversion {
            value: i128::from(value),
            bits,
        });
    }

    Ok(result)
}

/// Truncates a host number to a signed 32-bit integer.
///
/// Follows the host's `ToInt32` rules: the value is truncated toward zero and reduced modulo
/// 2^32; NaN and infinities map to zero.
///
/// ```rust
/// use memrt::numeric::to_int32;
///
/// assert_eq!(to_int32(3.9), 3);
/// assert_eq!(to_int32(-3.9), -3);
/// assert_eq!(to_int32(4_294_967_295.0), -1);
/// assert_eq!(to_int32(f64::NAN), 0);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_int32(value: f64) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    let modulo = value.trunc().rem_euclid(TWO_POW_32);
    (modulo as u64 as u32) as i32
}

/// Rounds half-way cases toward positive infinity, like the host's `Math.round`.
#[must_use]
pub fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}
