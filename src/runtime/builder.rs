//! Fluent construction of a [`Runtime`].

use std::sync::Arc;

use crate::{
    config::{CheckFlags, DispatchMode, RuntimeConfig},
    diagnostics::{Diagnostics, DiagnosticsSink},
    dispatch::{DispatchTable, FuncWrapperCache},
    layout::TypeRegistry,
    memory::{LinearMemory, MemoryGrower},
    numeric::Quantum,
    runtime::Runtime,
    Result,
};

/// Builder for [`Runtime`].
///
/// Starts from [`RuntimeConfig::default()`]. Every setting is validated in
/// [`RuntimeBuilder::build`], so the setters themselves never fail.
///
/// # Example
///
/// ```rust
/// use memrt::{CheckFlags, RuntimeBuilder};
///
/// let runtime = RuntimeBuilder::new()
///     .for_debug()
///     .quantum(8)
///     .stack_size(64 * 1024)
///     .initial_memory(1024 * 1024)
///     .max_memory(4 * 1024 * 1024)
///     .build()?;
///
/// assert_eq!(runtime.quantum().bytes(), 8);
/// assert!(runtime.config().checks.contains(CheckFlags::ASSERTIONS));
/// # Ok::<(), memrt::Error>(())
/// ```
#[derive(Default)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    quantum: Option<usize>,
    grower: Option<Box<dyn MemoryGrower>>,
    sink: Option<Arc<dyn DiagnosticsSink>>,
}

impl RuntimeBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.quantum = None;
        self.config = config;
        self
    }

    /// Uses the [`RuntimeConfig::debug()`] checks.
    #[must_use]
    pub fn for_debug(mut self) -> Self {
        self.config.checks = RuntimeConfig::debug().checks;
        self
    }

    /// Uses the [`RuntimeConfig::release()`] checks.
    #[must_use]
    pub fn for_release(mut self) -> Self {
        self.config.checks = RuntimeConfig::release().checks;
        self
    }

    /// Sets the quantum in bytes; must be a power of two no larger than 64.
    #[must_use]
    pub fn quantum(mut self, bytes: usize) -> Self {
        self.quantum = Some(bytes);
        self
    }

    /// Replaces the check flags.
    #[must_use]
    pub fn checks(mut self, checks: CheckFlags) -> Self {
        self.config.checks = checks;
        self
    }

    /// Enables additional checks.
    #[must_use]
    pub fn enable(mut self, checks: CheckFlags) -> Self {
        self.config.checks |= checks;
        self
    }

    /// Disables checks.
    #[must_use]
    pub fn disable(mut self, checks: CheckFlags) -> Self {
        self.config.checks -= checks;
        self
    }

    /// Sets the dispatch mode.
    #[must_use]
    pub fn dispatch(mut self, mode: DispatchMode) -> Self {
        self.config.dispatch = mode;
        self
    }

    /// Sets the stack size in bytes.
    #[must_use]
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.config.memory.stack_size = bytes;
        self
    }

    /// Sets the initial memory size in bytes.
    #[must_use]
    pub fn initial_memory(mut self, bytes: usize) -> Self {
        self.config.memory.initial_memory = bytes;
        self
    }

    /// Sets the hard cap for memory growth in bytes.
    #[must_use]
    pub fn max_memory(mut self, bytes: usize) -> Self {
        self.config.memory.max_memory = bytes;
        self
    }

    /// Uses a custom grow collaborator instead of the default doubling strategy.
    ///
    /// The memory never grows past [`RuntimeBuilder::max_memory`], whatever the grower answers.
    #[must_use]
    pub fn grower(mut self, grower: impl MemoryGrower + 'static) -> Self {
        self.grower = Some(Box::new(grower));
        self
    }

    /// Forwards diagnostics to `sink` instead of the `log` facade.
    #[must_use]
    pub fn diagnostics_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validates the configuration and creates the runtime.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::InvalidConfig`] for an invalid quantum or inconsistent memory sizes
    /// - [`crate::Error::OutOfMemory`] if the scratch slot does not fit into static memory
    pub fn build(self) -> Result<Runtime> {
        let mut config = self.config;
        if let Some(bytes) = self.quantum {
            config.quantum = Quantum::new(bytes)?;
        }
        config.validate()?;

        let mut memory = match self.grower {
            Some(grower) => LinearMemory::new(&config, grower)?,
            None => LinearMemory::from_config(&config)?,
        };
        let temp_double_ptr = memory.static_alloc(8)?;

        let diagnostics = Arc::new(match self.sink {
            Some(sink) => Diagnostics::with_sink(sink),
            None => Diagnostics::new(),
        });
        let table = Arc::new(DispatchTable::new(config.dispatch));
        let wrappers = FuncWrapperCache::new(table.clone(), diagnostics.clone());
        let types = TypeRegistry::new(config.quantum);

        log::debug!(
            "runtime ready: quantum {}, {} bytes of memory, stack 0x{:x}..0x{:x}, checks {:?}",
            config.quantum.bytes(),
            memory.size(),
            memory.stack().base(),
            memory.stack().limit(),
            config.checks
        );

        Ok(Runtime {
            config,
            memory,
            types,
            table,
            wrappers,
            diagnostics,
            temp_double_ptr,
        })
    }
}
