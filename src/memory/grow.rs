//! Growth strategies for the static region.
//!
//! When a static allocation does not fit, [`crate::memory::LinearMemory`] asks its
//! [`MemoryGrower`] once for a larger buffer. The grower answers with the new total size or
//! refuses; the memory then retries the allocation once.

/// Host collaborator that decides how far the linear memory may grow.
pub trait MemoryGrower: Send {
    /// Returns the new total memory size, or `None` to refuse.
    ///
    /// `current` is the present size and `requested` the minimum size needed for the pending
    /// allocation. An answer below `requested` is treated as a refusal.
    fn grow(&mut self, current: usize, requested: usize) -> Option<usize>;
}

/// Doubles the memory until the request fits, capped at a hard maximum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DoublingGrower {
    max: usize,
}

impl DoublingGrower {
    /// Creates a grower that never exceeds `max` bytes.
    #[must_use]
    pub fn new(max: usize) -> Self {
        DoublingGrower { max }
    }

    /// The hard cap.
    #[must_use]
    pub fn max(&self) -> usize {
        self.max
    }
}

impl MemoryGrower for DoublingGrower {
    fn grow(&mut self, current: usize, requested: usize) -> Option<usize> {
        if requested > self.max {
            return None;
        }
        let mut size = current.max(1);
        while size < requested {
            size = size.saturating_mul(2);
        }
        Some(size.min(self.max))
    }
}

/// Memory that never grows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FixedMemory;

impl MemoryGrower for FixedMemory {
    fn grow(&mut self, _current: usize, _requested: usize) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubling() {
        let mut grower = DoublingGrower::new(1024);
        assert_eq!(grower.grow(100, 150), Some(200));
        assert_eq!(grower.grow(100, 450), Some(800));
        assert_eq!(grower.grow(600, 700), Some(1024));
        assert_eq!(grower.grow(1024, 1025), None);
        assert_eq!(grower.grow(0, 3), Some(4));
    }

    #[test]
    fn test_fixed() {
        assert_eq!(FixedMemory.grow(10, 11), None);
    }
}
