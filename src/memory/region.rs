//! Bump regions inside the linear memory.
//!
//! A [`MemoryRegion`] only tracks addresses: the bytes themselves live in
//! [`crate::memory::LinearMemory`]. Allocation advances `top` towards `limit` and never moves
//! it past. On failure `top` is left untouched.

use strum::{Display, EnumIter};

use crate::{numeric::align_up, Error, Result};

/// The two regions of the linear memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum RegionKind {
    /// LIFO region, reset by stack frames
    #[strum(serialize = "stack")]
    Stack,
    /// Monotonic region, grows and never reclaims
    #[strum(serialize = "static")]
    Static,
}

/// Allocation behaviour of a region kind, selected at compile time.
pub trait AllocPolicy {
    /// Region this policy allocates from
    const KIND: RegionKind;
    /// Whether new allocations are cleared to zero
    const ZERO_FILL: bool;
    /// Whether an overflow may ask the grow collaborator for more memory
    const GROWABLE: bool;
}

/// Stack allocations are not zeroed and never grow the memory.
pub struct StackPolicy;

impl AllocPolicy for StackPolicy {
    const KIND: RegionKind = RegionKind::Stack;
    const ZERO_FILL: bool = false;
    const GROWABLE: bool = false;
}

/// Static allocations are zeroed and may grow the memory.
pub struct StaticPolicy;

impl AllocPolicy for StaticPolicy {
    const KIND: RegionKind = RegionKind::Static;
    const ZERO_FILL: bool = true;
    const GROWABLE: bool = true;
}

/// Address bookkeeping of a single region.
///
/// Always satisfies `base <= top <= limit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryRegion {
    kind: RegionKind,
    base: usize,
    top: usize,
    limit: usize,
}

impl MemoryRegion {
    pub(crate) fn new(kind: RegionKind, base: usize, limit: usize) -> Self {
        debug_assert!(base <= limit);
        MemoryRegion {
            kind,
            base,
            top: base,
            limit,
        }
    }

    /// Which region this is.
    #[must_use]
    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    /// First address of the region.
    #[must_use]
    pub fn base(&self) -> usize {
        self.base
    }

    /// Next free address.
    #[must_use]
    pub fn top(&self) -> usize {
        self.top
    }

    /// One past the last usable address.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes currently allocated.
    #[must_use]
    pub fn used(&self) -> usize {
        self.top - self.base
    }

    /// Bytes left before `limit`.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit - self.top
    }

    /// Returns `true` if `address` lies in `[base, limit)`.
    #[must_use]
    pub fn contains(&self, address: usize) -> bool {
        address >= self.base && address < self.limit
    }

    /// Top after allocating `size` bytes aligned to `alignment`, if it fits under the limit.
    pub(crate) fn next_top(&self, size: usize, alignment: usize) -> Option<usize> {
        let end = self.top.checked_add(size)?;
        let aligned = align_up(end, alignment);
        (aligned <= self.limit).then_some(aligned)
    }

    /// Advances `top` and returns the address of the new block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the block does not fit; `top` is unchanged.
    pub(crate) fn bump(&mut self, size: usize, alignment: usize) -> Result<usize> {
        let next = self.next_top(size, alignment).ok_or(Error::OutOfMemory {
            region: self.kind,
            requested: size,
            top: self.top,
            limit: self.limit,
        })?;
        let address = self.top;
        self.top = next;
        Ok(address)
    }

    pub(crate) fn set_top(&mut self, top: usize) -> Result<()> {
        if top < self.base || top > self.limit {
            return Err(Error::InvalidAddress {
                address: top,
                size: 0,
            });
        }
        self.top = top;
        Ok(())
    }

    pub(crate) fn set_limit(&mut self, limit: usize) {
        debug_assert!(limit >= self.top);
        self.limit = limit;
    }
}
