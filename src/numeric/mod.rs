//! Numeric primitives shared by the memory, layout and dispatch layers.
//!
//! # Key Components
//!
//! - [`align_up`] and [`Quantum`] - alignment arithmetic for addresses and struct offsets
//! - [`to_unsigned`] / [`to_signed`] - signedness reinterpretation for widths up to 64 bits
//! - [`Int64`] - 64-bit integers as `(low, high)` word pairs, with bit-exact shifts
//! - [`bitwise_combine`] / [`combine_to_approx`] - double-approximated 64-bit helpers
//!
//! # Examples
//!
//! ```rust
//! use memrt::numeric::{align_up, to_signed, to_unsigned, Int64, ShiftOp, SignCheck};
//!
//! assert_eq!(align_up(5, 4), 8);
//!
//! let raw = to_unsigned(-1, 16, SignCheck::Wrap)?;
//! assert_eq!(raw, 0xFFFF);
//! assert_eq!(to_signed(raw, 16, SignCheck::Wrap)?, -1);
//!
//! let v = Int64::from_i64(-8).shift(ShiftOp::ArithShiftRight, 1)?;
//! assert_eq!(v.to_i64(), -4);
//! # Ok::<(), memrt::Error>(())
//! ```

mod align;
mod int64;
mod sign;

pub use align::{align_up, Quantum, MAX_QUANTUM};
pub use int64::{bitwise_combine, combine_to_approx, shift, BitwiseOp, Int64, ShiftOp};
pub use sign::{round_half_up, to_int32, to_signed, to_unsigned, SignCheck, TWO_POW_32};
