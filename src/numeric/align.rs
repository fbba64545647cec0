//! Alignment arithmetic for addresses, offsets and struct fields.
//!
//! Everything that places bytes in linear memory goes through [`align_up`]: bump allocation in
//! both memory regions, struct field placement and the final struct size. The quantum is the
//! alignment granularity of the whole runtime and is carried around as a validated
//! [`Quantum`] so that the power-of-two fast path can be taken without re-checking.

use crate::{Error, Result};

/// Largest quantum accepted by [`Quantum::new`].
pub const MAX_QUANTUM: usize = 64;

/// Returns the smallest multiple of `quantum` that is greater than or equal to `target`.
///
/// Powers of two are rounded with a mask-and-shift, every other quantum with a ceiling
/// division. Both paths produce the same value, so results do not depend on whether the
/// quantum is known at compile time.
///
/// A quantum of `0` or `1` is the identity.
///
/// # Examples
///
/// ```rust
/// use memrt::numeric::align_up;
///
/// assert_eq!(align_up(13, 4), 16);
/// assert_eq!(align_up(16, 4), 16);
/// assert_eq!(align_up(7, 3), 9);
/// assert_eq!(align_up(7, 1), 7);
/// ```
#[must_use]
pub const fn align_up(target: usize, quantum: usize) -> usize {
    if quantum <= 1 {
        return target;
    }
    if quantum.is_power_of_two() {
        let shift = quantum.trailing_zeros();
        ((target + (quantum - 1)) >> shift) << shift
    } else {
        target.div_ceil(quantum) * quantum
    }
}

/// The alignment granularity (in bytes) enforced for allocations and struct fields.
///
/// A quantum is always a power of two between 1 and [`MAX_QUANTUM`]. Typical values are
/// 1 (every value occupies one memory cell), 4 (32-bit ABI) and 8.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quantum(usize);

impl Quantum {
    /// One byte per memory cell; disables alignment entirely.
    pub const BYTE: Self = Self(1);

    /// 32-bit ABI quantum.
    pub const WORD: Self = Self(4);

    /// 64-bit ABI quantum.
    pub const DOUBLE_WORD: Self = Self(8);

    /// Creates a quantum after checking it is a power of two no larger than [`MAX_QUANTUM`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for zero, non power-of-two or oversized values.
    pub fn new(bytes: usize) -> Result<Self> {
        if bytes == 0 || !bytes.is_power_of_two() || bytes > MAX_QUANTUM {
            return Err(Error::InvalidConfig(format!(
                "quantum must be a power of two in 1..={MAX_QUANTUM}, got {bytes}"
            )));
        }
        Ok(Self(bytes))
    }

    /// Returns the quantum in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        self.0
    }

    /// Returns `log2` of the quantum.
    #[must_use]
    pub const fn log2(self) -> u32 {
        self.0.trailing_zeros()
    }

    /// Aligns `target` up to this quantum.
    #[must_use]
    pub const fn align(self, target: usize) -> usize {
        let shift = self.log2();
        ((target + (self.0 - 1)) >> shift) << shift
    }

    /// Aligns `target` to `quantum`, falling back to this quantum when `quantum` is zero.
    #[must_use]
    pub const fn align_with(self, target: usize, quantum: usize) -> usize {
        if quantum == 0 {
            self.align(target)
        } else {
            align_up(target, quantum)
        }
    }

    /// Returns `true` if `value` is a multiple of this quantum.
    #[must_use]
    pub const fn is_aligned(self, value: usize) -> bool {
        value & (self.0 - 1) == 0
    }
}

impl Default for Quantum {
    fn default() -> Self {
        Self::WORD
    }
}

impl TryFrom<usize> for Quantum {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up_power_of_two_properties() {
        for quantum in [1usize, 2, 4, 8, 16, 32, 64] {
            for target in 0..300usize {
                let aligned = align_up(target, quantum);
                assert_eq!(aligned % quantum, 0);
                assert!(aligned >= target);
                assert!(aligned < target + quantum);
            }
        }
    }

    #[test]
    fn test_align_up_matches_ceiling_division() {
        for quantum in [2usize, 4, 8, 16] {
            for target in 0..100usize {
                assert_eq!(align_up(target, quantum), target.div_ceil(quantum) * quantum);
            }
        }
    }

    #[test]
    fn test_align_up_non_power_of_two() {
        assert_eq!(align_up(0, 3), 0);
        assert_eq!(align_up(1, 3), 3);
        assert_eq!(align_up(10, 6), 12);
        assert_eq!(align_up(12, 6), 12);
    }

    #[test]
    fn test_align_up_identity() {
        assert_eq!(align_up(17, 1), 17);
        assert_eq!(align_up(17, 0), 17);
    }

    #[test]
    fn test_align_up_const_and_runtime_agree() {
        const ALIGNED: usize = align_up(13, 8);
        let quantum = std::hint::black_box(8);
        assert_eq!(ALIGNED, align_up(std::hint::black_box(13), quantum));
    }

    #[test]
    fn test_quantum_validation() {
        assert!(Quantum::new(0).is_err());
        assert!(Quantum::new(3).is_err());
        assert!(Quantum::new(128).is_err());
        assert_eq!(Quantum::new(8).unwrap(), Quantum::DOUBLE_WORD);
        assert_eq!(Quantum::try_from(4usize).unwrap().log2(), 2);
    }

    #[test]
    fn test_quantum_align() {
        let q = Quantum::WORD;
        assert_eq!(q.align(0), 0);
        assert_eq!(q.align(1), 4);
        assert_eq!(q.align(4), 4);
        assert_eq!(q.align_with(5, 0), 8);
        assert_eq!(q.align_with(5, 2), 6);
        assert!(q.is_aligned(12));
        assert!(!q.is_aligned(13));
        assert_eq!(Quantum::BYTE.align(13), 13);
    }
}
