//! The linear memory buffer and its two regions.
//!
//! [`LinearMemory`] owns one contiguous byte buffer that stands in for the address space of
//! the compiled program. It is split into:
//!
//! ```text
//! 0        stack.base          stack.limit / statics.base        statics.limit == size()
//! | reserved |  stack (LIFO) ->  |  static (monotonic, grows) ->  |
//! ```
//!
//! Address 0 is never handed out, so it can serve as the null pointer. The stack starts at
//! the first quantum-aligned address at or after 8.
//!
//! # Stack Invalidation
//!
//! With [`CheckFlags::STACK_INVALIDATION`] every byte released by
//! [`LinearMemory::stack_exit`] is zeroed and poisoned. Reading a poisoned byte while
//! [`CheckFlags::ASSERTIONS`] is set fails; writing a byte clears its poison.
//!
//! # Example
//!
//! ```rust
//! use memrt::memory::LinearMemory;
//! use memrt::RuntimeConfig;
//!
//! let mut mem = LinearMemory::from_config(&RuntimeConfig::debug())?;
//!
//! let frame = mem.stack_enter(16)?;
//! let local = mem.stack_alloc(4)?;
//! mem.store_i32(local, -7)?;
//! assert_eq!(mem.load_i32(local)?, -7);
//! mem.stack_exit(frame)?;
//!
//! let global = mem.static_alloc(8)?;
//! assert_eq!(mem.load_f64(global)?, 0.0);
//! # Ok::<(), memrt::Error>(())
//! ```

use std::{fmt, ops::Range};

use crate::{
    config::{CheckFlags, RuntimeConfig},
    memory::{
        frame::StackFrame,
        grow::{DoublingGrower, FixedMemory, MemoryGrower},
        region::{AllocPolicy, MemoryRegion, RegionKind, StackPolicy, StaticPolicy},
    },
    numeric::{align_up, Int64, Quantum},
    Error, Result,
};

/// Lowest address the stack may start at.
const STACK_FLOOR: usize = 8;

/// Byte-addressable memory with a stack and a static region.
pub struct LinearMemory {
    /// The raw bytes.
    data: Vec<u8>,
    /// One flag per byte, set for invalidated stack bytes.
    poison: Vec<bool>,
    stack: MemoryRegion,
    statics: MemoryRegion,
    /// Saved tops of the open frames, innermost last.
    frames: Vec<usize>,
    quantum: Quantum,
    checks: CheckFlags,
    grower: Box<dyn MemoryGrower>,
    /// Hard cap on the buffer size, whatever the grower answers
    max_memory: usize,
}

impl LinearMemory {
    /// Creates a memory laid out according to `config`, growing through `grower`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration is inconsistent.
    pub fn new(config: &RuntimeConfig, grower: Box<dyn MemoryGrower>) -> Result<Self> {
        config.validate()?;

        let quantum = config.quantum;
        let size = config.memory.initial_memory;
        let stack_base = quantum.align(STACK_FLOOR);
        let stack_limit = stack_base + config.memory.stack_size;
        let static_base = quantum.align(stack_limit);

        Ok(LinearMemory {
            data: vec![0; size],
            poison: vec![false; size],
            stack: MemoryRegion::new(RegionKind::Stack, stack_base, stack_limit),
            statics: MemoryRegion::new(RegionKind::Static, static_base, size),
            frames: Vec::new(),
            quantum,
            checks: config.checks,
            grower,
            max_memory: config.memory.max_memory,
        })
    }

    /// Creates a memory with the default grower for `config`.
    ///
    /// Uses a [`DoublingGrower`] capped at `max_memory` when growth is allowed, otherwise
    /// [`FixedMemory`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration is inconsistent.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        let grower: Box<dyn MemoryGrower> = if config.memory.can_grow() {
            Box::new(DoublingGrower::new(config.memory.max_memory))
        } else {
            Box::new(FixedMemory)
        };
        Self::new(config, grower)
    }

    /// Current size of the buffer in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// The alignment quantum.
    #[must_use]
    pub fn quantum(&self) -> Quantum {
        self.quantum
    }

    /// The active checks.
    #[must_use]
    pub fn checks(&self) -> CheckFlags {
        self.checks
    }

    /// The stack region.
    #[must_use]
    pub fn stack(&self) -> &MemoryRegion {
        &self.stack
    }

    /// The static region.
    #[must_use]
    pub fn statics(&self) -> &MemoryRegion {
        &self.statics
    }

    /// Number of open, non-elided stack frames.
    #[must_use]
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` if the byte at `address` was invalidated by a closed frame.
    #[must_use]
    pub fn is_poisoned(&self, address: usize) -> bool {
        self.poison.get(address).copied().unwrap_or(false)
    }

    fn region_mut(&mut self, kind: RegionKind) -> &mut MemoryRegion {
        match kind {
            RegionKind::Stack => &mut self.stack,
            RegionKind::Static => &mut self.statics,
        }
    }

    /// Allocates `size` bytes from the region selected by `P`.
    ///
    /// Returns the address of the block, which is the region top before the call. The top is
    /// advanced to `align_up(top + size, alignment)`; an alignment of 0 uses the quantum.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the block does not fit, after one growth attempt for
    /// growable regions. The region top is unchanged.
    pub fn alloc<P: AllocPolicy>(&mut self, size: usize, alignment: usize) -> Result<usize> {
        let alignment = if alignment == 0 {
            self.quantum.bytes()
        } else {
            alignment
        };

        let address = match self.region_mut(P::KIND).bump(size, alignment) {
            Ok(address) => address,
            Err(err) => {
                if !P::GROWABLE || !self.grow_for(P::KIND, size, alignment) {
                    return Err(err);
                }
                self.region_mut(P::KIND).bump(size, alignment)?
            }
        };

        let end = self.region_mut(P::KIND).top();
        if P::ZERO_FILL {
            self.data[address..end].fill(0);
        }
        // a fresh block is live again, whatever frame owned it before
        self.poison[address..end].fill(false);
        Ok(address)
    }

    /// Asks the grower for enough memory to fit the pending allocation.
    fn grow_for(&mut self, kind: RegionKind, size: usize, alignment: usize) -> bool {
        let region = *self.region_mut(kind);
        let Some(needed) = region
            .top()
            .checked_add(size)
            .map(|end| align_up(end, alignment))
        else {
            return false;
        };

        let current = self.data.len();
        if needed > self.max_memory {
            log::debug!(
                "grow of {kind} region to {needed} bytes exceeds the {} byte cap",
                self.max_memory
            );
            return false;
        }

        match self.grower.grow(current, needed) {
            Some(new_size) if new_size >= needed => {
                let new_size = new_size.min(self.max_memory);
                log::debug!("growing {kind} region: {current} -> {new_size} bytes");
                self.data.resize(new_size, 0);
                self.poison.resize(new_size, false);
                self.region_mut(kind).set_limit(new_size);
                true
            }
            _ => {
                log::debug!("grow of {kind} region to {needed} bytes refused at {current} bytes");
                false
            }
        }
    }

    /// Allocates quantum-aligned, uninitialized stack memory.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfMemory`] if the stack limit would be passed
    /// - [`Error::AssertionFailure`] with assertions enabled, if the new top reaches the limit
    pub fn stack_alloc(&mut self, size: usize) -> Result<usize> {
        let address = self.alloc::<StackPolicy>(size, self.quantum.bytes())?;
        if self.checks.contains(CheckFlags::ASSERTIONS) && self.stack.top() >= self.stack.limit() {
            let top = self.stack.top();
            self.stack.set_top(address)?;
            return Err(assertion_error!(
                "stack top 0x{:x} reached limit 0x{:x}",
                top,
                self.stack.limit()
            ));
        }
        Ok(address)
    }

    /// Allocates quantum-aligned, zeroed static memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the memory cannot grow far enough.
    pub fn static_alloc(&mut self, size: usize) -> Result<usize> {
        self.alloc::<StaticPolicy>(size, self.quantum.bytes())
    }

    /// Allocates from the given region.
    ///
    /// # Errors
    ///
    /// See [`LinearMemory::stack_alloc`] and [`LinearMemory::static_alloc`].
    pub fn allocate(&mut self, kind: RegionKind, size: usize) -> Result<usize> {
        match kind {
            RegionKind::Stack => self.stack_alloc(size),
            RegionKind::Static => self.static_alloc(size),
        }
    }

    /// Opens a stack frame of `initial` bytes.
    ///
    /// Zero-sized frames are elided when [`CheckFlags::SKIP_EMPTY_FRAMES`] is set and stack
    /// invalidation is off.
    ///
    /// # Errors
    ///
    /// - [`Error::AssertionFailure`] with assertions enabled, if `initial` is not a multiple of
    ///   the quantum or the frame reaches the stack limit
    /// - [`Error::OutOfMemory`] if the frame does not fit
    pub fn stack_enter(&mut self, initial: usize) -> Result<StackFrame> {
        self.enter_frame(initial, false)
    }

    /// Opens a stack frame that is never elided.
    ///
    /// # Errors
    ///
    /// Same as [`LinearMemory::stack_enter`].
    pub fn stack_enter_forced(&mut self, initial: usize) -> Result<StackFrame> {
        self.enter_frame(initial, true)
    }

    fn enter_frame(&mut self, initial: usize, forced: bool) -> Result<StackFrame> {
        if initial == 0
            && !forced
            && self.checks.contains(CheckFlags::SKIP_EMPTY_FRAMES)
            && !self.checks.contains(CheckFlags::STACK_INVALIDATION)
        {
            return Ok(StackFrame::Elided);
        }

        check_assert!(
            self.checks,
            self.quantum.is_aligned(initial),
            "frame size {} is not a multiple of the quantum {}",
            initial,
            self.quantum.bytes()
        );

        let saved_top = self.stack.top();
        if initial > 0 {
            self.stack_alloc(initial)?;
        }
        self.frames.push(saved_top);
        let depth = self.frames.len();

        log::trace!("enter frame {depth} at 0x{saved_top:x} (+{initial})");
        Ok(StackFrame::Active { saved_top, depth })
    }

    /// Closes a stack frame and restores the stack top it captured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameOrder`] if `frame` is not the innermost open frame.
    pub fn stack_exit(&mut self, frame: StackFrame) -> Result<()> {
        let StackFrame::Active { saved_top, depth } = frame else {
            return Ok(());
        };

        let current = self.frames.len();
        if current != depth || self.frames.last() != Some(&saved_top) {
            return Err(Error::FrameOrder {
                expected_depth: current,
                found_depth: depth,
            });
        }
        self.frames.pop();

        let top = self.stack.top();
        if self.checks.contains(CheckFlags::STACK_INVALIDATION) && top > saved_top {
            self.data[saved_top..top].fill(0);
            self.poison[saved_top..top].fill(true);
        }

        log::trace!("exit frame {depth}, 0x{top:x} -> 0x{saved_top:x}");
        self.stack.set_top(saved_top)
    }

    /// Returns the raw stack top.
    #[must_use]
    pub fn stack_save(&self) -> usize {
        self.stack.top()
    }

    /// Sets the raw stack top.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if `top` is outside the stack region.
    pub fn stack_restore(&mut self, top: usize) -> Result<()> {
        self.stack.set_top(top)
    }

    fn range(&self, address: usize, size: usize) -> Result<Range<usize>> {
        address
            .checked_add(size)
            .filter(|&end| end <= self.data.len())
            .map(|end| address..end)
            .ok_or(Error::InvalidAddress { address, size })
    }

    fn readable(&self, address: usize, size: usize) -> Result<Range<usize>> {
        let range = self.range(address, size)?;
        if self.checks.contains(CheckFlags::ASSERTIONS) {
            if let Some(pos) = self.poison[range.clone()].iter().position(|&p| p) {
                return Err(assertion_error!(
                    "read of invalidated stack memory at 0x{:x}",
                    address + pos
                ));
            }
        }
        Ok(range)
    }

    /// Reads `size` bytes starting at `address`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidAddress`] if the range is outside the buffer
    /// - [`Error::AssertionFailure`] with assertions enabled, if a byte is poisoned
    pub fn read(&self, address: usize, size: usize) -> Result<&[u8]> {
        let range = self.readable(address, size)?;
        Ok(&self.data[range])
    }

    /// Writes `bytes` starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the range is outside the buffer.
    pub fn write(&mut self, address: usize, bytes: &[u8]) -> Result<()> {
        let range = self.range(address, bytes.len())?;
        self.data[range.clone()].copy_from_slice(bytes);
        self.poison[range].fill(false);
        Ok(())
    }

    /// Fills `size` bytes starting at `address` with `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the range is outside the buffer.
    pub fn memset(&mut self, address: usize, value: u8, size: usize) -> Result<()> {
        let range = self.range(address, size)?;
        self.data[range.clone()].fill(value);
        self.poison[range].fill(false);
        Ok(())
    }

    /// Copies `size` bytes from `src` to `dest`. Overlapping ranges are handled.
    ///
    /// Invalidation marks travel with the bytes, so a copied-out stale value is still caught
    /// when the destination is read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if either range is outside the buffer.
    pub fn memcpy(&mut self, dest: usize, src: usize, size: usize) -> Result<()> {
        if size == 0 {
            return Ok(());
        }
        let src_range = self.range(src, size)?;
        self.range(dest, size)?;

        self.data.copy_within(src_range.clone(), dest);
        self.poison.copy_within(src_range, dest);
        Ok(())
    }

    fn read_array<const N: usize>(&self, address: usize) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read(address, N)?);
        Ok(out)
    }

    /// Loads a signed byte.
    ///
    /// # Errors
    ///
    /// Same as [`LinearMemory::read`].
    pub fn load_i8(&self, address: usize) -> Result<i8> {
        Ok(i8::from_le_bytes(self.read_array(address)?))
    }

    /// Loads a little-endian `i16`.
    ///
    /// # Errors
    ///
    /// Same as [`LinearMemory::read`].
    pub fn load_i16(&self, address: usize) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array(address)?))
    }

    /// Loads a little-endian `i32`.
    ///
    /// # Errors
    ///
    /// Same as [`LinearMemory::read`].
    pub fn load_i32(&self, address: usize) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array(address)?))
    }

    /// Loads a 64-bit value stored as a low word followed by a high word.
    ///
    /// # Errors
    ///
    /// Same as [`LinearMemory::read`].
    pub fn load_i64(&self, address: usize) -> Result<Int64> {
        let bytes: [u8; 8] = self.read_array(address)?;
        let low = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let high = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Ok(Int64::new(low, high))
    }

    /// Loads a little-endian `f32`.
    ///
    /// # Errors
    ///
    /// Same as [`LinearMemory::read`].
    pub fn load_f32(&self, address: usize) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array(address)?))
    }

    /// Loads a little-endian `f64`.
    ///
    /// # Errors
    ///
    /// Same as [`LinearMemory::read`].
    pub fn load_f64(&self, address: usize) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array(address)?))
    }

    /// Stores a signed byte.
    ///
    /// # Errors
    ///
    /// Same as [`LinearMemory::write`].
    pub fn store_i8(&mut self, address: usize, value: i8) -> Result<()> {
        self.write(address, &value.to_le_bytes())
    }

    /// Stores a little-endian `i16`.
    ///
    /// # Errors
    ///
    /// Same as [`LinearMemory::write`].
    pub fn store_i16(&mut self, address: usize, value: i16) -> Result<()> {
        self.write(address, &value.to_le_bytes())
    }

    /// Stores a little-endian `i32`.
    ///
    /// # Errors
    ///
    /// Same as [`LinearMemory::write`].
    pub fn store_i32(&mut self, address: usize, value: i32) -> Result<()> {
        self.write(address, &value.to_le_bytes())
    }

    /// Stores a 64-bit value as a low word followed by a high word.
    ///
    /// # Errors
    ///
    /// Same as [`LinearMemory::write`].
    pub fn store_i64(&mut self, address: usize, value: Int64) -> Result<()> {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&value.low.to_le_bytes());
        bytes[4..].copy_from_slice(&value.high.to_le_bytes());
        self.write(address, &bytes)
    }

    /// Stores a little-endian `f32`.
    ///
    /// # Errors
    ///
    /// Same as [`LinearMemory::write`].
    pub fn store_f32(&mut self, address: usize, value: f32) -> Result<()> {
        self.write(address, &value.to_le_bytes())
    }

    /// Stores a little-endian `f64`.
    ///
    /// # Errors
    ///
    /// Same as [`LinearMemory::write`].
    pub fn store_f64(&mut self, address: usize, value: f64) -> Result<()> {
        self.write(address, &value.to_le_bytes())
    }
}

impl fmt::Debug for LinearMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearMemory")
            .field("size", &self.data.len())
            .field("max_memory", &self.max_memory)
            .field("stack", &self.stack)
            .field("statics", &self.statics)
            .field("frames", &self.frames.len())
            .field("quantum", &self.quantum)
            .field("checks", &self.checks)
            .finish_non_exhaustive()
    }
}
