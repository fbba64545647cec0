//! Runtime configuration types.
//!
//! Configuration is an input to the runtime and never changes after
//! [`crate::RuntimeBuilder::build`]. It is organized into:
//!
//! - [`RuntimeConfig`] - Top-level configuration container
//! - [`MemoryConfig`] - Linear memory sizes
//! - [`CheckFlags`] - Optional runtime checks
//! - [`DispatchMode`] - How indirect calls reach the function table
//!
//! # Configuration Presets
//!
//! - [`RuntimeConfig::debug()`] - All checks enabled, frames never elided
//! - [`RuntimeConfig::release()`] - No checks, empty frames elided
//!
//! # Example
//!
//! ```rust
//! use memrt::{CheckFlags, RuntimeConfig};
//! use memrt::numeric::Quantum;
//!
//! let config = RuntimeConfig::release()
//!     .with_quantum(Quantum::DOUBLE_WORD)
//!     .with_checks(CheckFlags::ASSERTIONS);
//! assert!(config.assertions());
//! ```

use bitflags::bitflags;
use strum::{Display, EnumIter, EnumString};

use crate::{
    numeric::{Quantum, SignCheck},
    Error, Result,
};

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    /// Optional checks performed by the runtime
    pub struct CheckFlags : u32 {
        /// Verify allocation, frame and access invariants
        const ASSERTIONS = 0x0001;
        /// Reject sign conversions that would change the value
        const STRICT_SIGNS = 0x0002;
        /// Zero and poison stack bytes when their frame is closed
        const STACK_INVALIDATION = 0x0004;
        /// Skip zero-sized stack frames
        const SKIP_EMPTY_FRAMES = 0x0008;
    }
}

/// How [`crate::dispatch::DispatchTable::call`] reaches the registered function.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum DispatchMode {
    /// Calls go through a per-signature trampoline
    #[default]
    #[strum(serialize = "signature")]
    SignatureRouted,
    /// Calls invoke the table slot directly
    #[strum(serialize = "direct")]
    Direct,
}

/// Sizes of the linear memory and its regions.
///
/// # Default Values
///
/// - `stack_size`: 5 MB
/// - `initial_memory`: 16 MB
/// - `max_memory`: 256 MB
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Bytes reserved for the stack region.
    pub stack_size: usize,

    /// Size of the linear buffer at startup. The stack and the initial static region must
    /// fit in it.
    pub initial_memory: usize,

    /// Hard cap for growing the static region.
    ///
    /// Equal to `initial_memory` for a memory that never grows.
    pub max_memory: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            stack_size: 5 * 1024 * 1024,        // 5 MB
            initial_memory: 16 * 1024 * 1024,   // 16 MB
            max_memory: 256 * 1024 * 1024,      // 256 MB
        }
    }
}

impl MemoryConfig {
    /// Returns `true` if the static region may grow past `initial_memory`.
    #[must_use]
    pub fn can_grow(&self) -> bool {
        self.max_memory > self.initial_memory
    }
}

/// Top-level runtime configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Alignment granularity for allocations and struct fields
    pub quantum: Quantum,
    /// Optional runtime checks
    pub checks: CheckFlags,
    /// Indirect call routing
    pub dispatch: DispatchMode,
    /// Memory sizes
    pub memory: MemoryConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            quantum: Quantum::WORD,
            checks: CheckFlags::SKIP_EMPTY_FRAMES,
            dispatch: DispatchMode::SignatureRouted,
            memory: MemoryConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Preset with every check enabled.
    ///
    /// Stack invalidation disables frame elision, so every frame is real.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            checks: CheckFlags::ASSERTIONS
                | CheckFlags::STRICT_SIGNS
                | CheckFlags::STACK_INVALIDATION,
            ..Self::default()
        }
    }

    /// Preset without runtime checks.
    #[must_use]
    pub fn release() -> Self {
        Self {
            checks: CheckFlags::SKIP_EMPTY_FRAMES,
            ..Self::default()
        }
    }

    /// Sets the quantum.
    #[must_use]
    pub fn with_quantum(mut self, quantum: Quantum) -> Self {
        self.quantum = quantum;
        self
    }

    /// Replaces the check flags.
    #[must_use]
    pub fn with_checks(mut self, checks: CheckFlags) -> Self {
        self.checks = checks;
        self
    }

    /// Sets the dispatch mode.
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Replaces the memory configuration.
    #[must_use]
    pub fn with_memory(mut self, memory: MemoryConfig) -> Self {
        self.memory = memory;
        self
    }

    /// Whether invariant assertions are enabled.
    #[must_use]
    pub fn assertions(&self) -> bool {
        self.checks.contains(CheckFlags::ASSERTIONS)
    }

    /// Sign conversion mode implied by [`CheckFlags::STRICT_SIGNS`].
    #[must_use]
    pub fn sign_check(&self) -> SignCheck {
        SignCheck::from_strict(self.checks.contains(CheckFlags::STRICT_SIGNS))
    }

    /// Checks the configuration for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the stack (starting at the first quantum-aligned
    /// address at or after 8) does not fit into the initial memory or
    /// the maximum memory is smaller than the initial memory.
    pub fn validate(&self) -> Result<()> {
        let stack_base = self.quantum.align(8);
        let stack_end = stack_base
            .checked_add(self.memory.stack_size)
            .map(|end| self.quantum.align(end))
            .ok_or_else(|| Error::InvalidConfig("stack size overflows the address space".into()))?;

        if stack_end > self.memory.initial_memory {
            return Err(Error::InvalidConfig(format!(
                "stack of {} bytes does not fit in {} bytes of initial memory",
                self.memory.stack_size, self.memory.initial_memory
            )));
        }
        if self.memory.max_memory < self.memory.initial_memory {
            return Err(Error::InvalidConfig(format!(
                "max memory {} is smaller than initial memory {}",
                self.memory.max_memory, self.memory.initial_memory
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_presets() {
        let debug = RuntimeConfig::debug();
        assert!(debug.assertions());
        assert_eq!(debug.sign_check(), SignCheck::Strict);
        assert!(debug.checks.contains(CheckFlags::STACK_INVALIDATION));
        assert!(!debug.checks.contains(CheckFlags::SKIP_EMPTY_FRAMES));

        let release = RuntimeConfig::release();
        assert!(!release.assertions());
        assert_eq!(release.sign_check(), SignCheck::Wrap);
        assert_eq!(release, RuntimeConfig::default());
    }

    #[test]
    fn test_validate() {
        assert!(RuntimeConfig::default().validate().is_ok());

        let too_small = RuntimeConfig::default().with_memory(MemoryConfig {
            stack_size: 1024,
            initial_memory: 512,
            max_memory: 512,
        });
        assert!(matches!(too_small.validate(), Err(Error::InvalidConfig(_))));

        let shrinking = RuntimeConfig::default().with_memory(MemoryConfig {
            stack_size: 64,
            initial_memory: 1024,
            max_memory: 512,
        });
        assert!(matches!(shrinking.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_dispatch_mode_names() {
        assert_eq!(DispatchMode::Direct.to_string(), "direct");
        assert_eq!(
            DispatchMode::from_str("signature").unwrap(),
            DispatchMode::SignatureRouted
        );
    }

    #[test]
    fn test_can_grow() {
        assert!(MemoryConfig::default().can_grow());
        let fixed = MemoryConfig {
            stack_size: 64,
            initial_memory: 1024,
            max_memory: 1024,
        };
        assert!(!fixed.can_grow());
    }
}
