//! The runtime context object.

use std::sync::Arc;

use crate::{
    codec::{encode_string, Utf8Decoder},
    config::RuntimeConfig,
    diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics},
    dispatch::{DispatchTable, FuncWrapper, FuncWrapperCache, Signature},
    layout::{
        resolve_named_offsets, struct_info_inline, NamedField, StructInfo, StructTypeRc,
        TypeDescriptor, TypeRegistry,
    },
    memory::{LinearMemory, RegionKind, StackFrame},
    numeric::{shift, to_signed, to_unsigned, Int64, Quantum, ShiftOp},
    runtime::RuntimeBuilder,
    value::HostValue,
    Error, Result,
};

/// One execution context: linear memory, struct types, function table and diagnostics.
///
/// Created through [`RuntimeBuilder`]. The function table and the diagnostics are shared via
/// `Arc` and may be handed to other threads; the memory is owned exclusively.
///
/// # Example
///
/// ```rust
/// use memrt::memory::RegionKind;
/// use memrt::numeric::ShiftOp;
/// use memrt::{Runtime, RuntimeConfig};
///
/// let mut runtime = Runtime::new(RuntimeConfig::debug())?;
///
/// let text = runtime.alloc_string("hi €", RegionKind::Static)?;
/// assert_eq!(runtime.read_c_string(text)?, "hi €");
///
/// let shifted = runtime.bitshift64(1, 0, ShiftOp::ShiftLeft, 33)?;
/// assert_eq!((shifted.low, shifted.high), (0, 2));
/// # Ok::<(), memrt::Error>(())
/// ```
#[derive(Debug)]
pub struct Runtime {
    pub(super) config: RuntimeConfig,
    pub(super) memory: LinearMemory,
    pub(super) types: TypeRegistry,
    pub(super) table: Arc<DispatchTable>,
    pub(super) wrappers: FuncWrapperCache,
    pub(super) diagnostics: Arc<Diagnostics>,
    /// Static scratch slot that receives the result of [`Runtime::bitshift64`]
    pub(super) temp_double_ptr: usize,
}

impl Runtime {
    /// Creates a runtime from `config` with the default grower and diagnostics sink.
    ///
    /// # Errors
    ///
    /// See [`RuntimeBuilder::build`].
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        RuntimeBuilder::new().config(config).build()
    }

    /// The configuration the runtime was built with.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The alignment quantum.
    #[must_use]
    pub fn quantum(&self) -> Quantum {
        self.config.quantum
    }

    /// The linear memory.
    #[must_use]
    pub fn memory(&self) -> &LinearMemory {
        &self.memory
    }

    /// Mutable access to the linear memory, for loads, stores and block operations.
    pub fn memory_mut(&mut self) -> &mut LinearMemory {
        &mut self.memory
    }

    /// The struct type registry.
    #[must_use]
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// The shared function table.
    #[must_use]
    pub fn table(&self) -> &Arc<DispatchTable> {
        &self.table
    }

    /// The shared diagnostics.
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    /// Address of the 8-byte static scratch slot.
    #[must_use]
    pub fn temp_double_ptr(&self) -> usize {
        self.temp_double_ptr
    }

    /// Aligns `target` to `quantum`, or to the runtime quantum when `quantum` is 0.
    #[must_use]
    pub fn align(&self, target: usize, quantum: usize) -> usize {
        self.config.quantum.align_with(target, quantum)
    }

    /// See [`LinearMemory::stack_alloc`].
    ///
    /// # Errors
    ///
    /// See [`LinearMemory::stack_alloc`].
    pub fn stack_alloc(&mut self, size: usize) -> Result<usize> {
        let result = self.memory.stack_alloc(size);
        self.report(DiagnosticCategory::Memory, result)
    }

    /// See [`LinearMemory::static_alloc`].
    ///
    /// # Errors
    ///
    /// See [`LinearMemory::static_alloc`].
    pub fn static_alloc(&mut self, size: usize) -> Result<usize> {
        self.allocate(RegionKind::Static, size)
    }

    /// Allocates from the given region. Static growth is recorded as an info diagnostic.
    ///
    /// # Errors
    ///
    /// See [`LinearMemory::allocate`].
    pub fn allocate(&mut self, region: RegionKind, size: usize) -> Result<usize> {
        let before = self.memory.size();
        let result = self.memory.allocate(region, size);

        let after = self.memory.size();
        if after > before {
            self.diagnostics.info(
                DiagnosticCategory::Memory,
                format!("{region} region grew memory from {before} to {after} bytes"),
            );
        }
        self.report(DiagnosticCategory::Memory, result)
    }

    /// See [`LinearMemory::stack_enter`].
    ///
    /// # Errors
    ///
    /// See [`LinearMemory::stack_enter`].
    pub fn stack_enter(&mut self, initial: usize) -> Result<StackFrame> {
        let result = self.memory.stack_enter(initial);
        self.report(DiagnosticCategory::Memory, result)
    }

    /// See [`LinearMemory::stack_enter_forced`].
    ///
    /// # Errors
    ///
    /// See [`LinearMemory::stack_enter`].
    pub fn stack_enter_forced(&mut self, initial: usize) -> Result<StackFrame> {
        let result = self.memory.stack_enter_forced(initial);
        self.report(DiagnosticCategory::Memory, result)
    }

    /// See [`LinearMemory::stack_exit`].
    ///
    /// # Errors
    ///
    /// See [`LinearMemory::stack_exit`].
    pub fn stack_exit(&mut self, frame: StackFrame) -> Result<()> {
        let result = self.memory.stack_exit(frame);
        self.report(DiagnosticCategory::Memory, result)
    }

    /// See [`LinearMemory::stack_save`].
    #[must_use]
    pub fn stack_save(&self) -> usize {
        self.memory.stack_save()
    }

    /// See [`LinearMemory::stack_restore`].
    ///
    /// # Errors
    ///
    /// See [`LinearMemory::stack_restore`].
    pub fn stack_restore(&mut self, top: usize) -> Result<()> {
        let result = self.memory.stack_restore(top);
        self.report(DiagnosticCategory::Memory, result)
    }

    /// Parses a textual type name. See [`TypeRegistry::parse_type`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownType`] for unrecognized names.
    pub fn parse_type(&self, name: &str) -> Result<TypeDescriptor> {
        self.report(DiagnosticCategory::Layout, self.types.parse_type(name))
    }

    /// Registers a named struct from textual field type names.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::UnknownType`] if a field type cannot be parsed
    /// - [`crate::Error::TypeInsert`] if the name is bound to a different shape
    pub fn register_struct(
        &self,
        name: &str,
        field_types: &[&str],
        packed: bool,
    ) -> Result<StructTypeRc> {
        let result = field_types
            .iter()
            .map(|ty| self.types.parse_type(ty))
            .collect::<Result<Vec<_>>>()
            .and_then(|fields| self.types.register_struct(name, fields, packed));
        self.report(DiagnosticCategory::Layout, result)
    }

    /// Maps field names onto a registered struct. See [`resolve_named_offsets`].
    ///
    /// # Errors
    ///
    /// See [`resolve_named_offsets`].
    pub fn resolve_named_offsets(
        &self,
        names: &[NamedField],
        type_name: &str,
        base_offset: usize,
    ) -> Result<StructInfo> {
        let result = resolve_named_offsets(&self.types, names, type_name, base_offset);
        self.report(DiagnosticCategory::Layout, result)
    }

    /// Computes offsets for `(type name, field name)` pairs without a registered type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownType`] if a type name cannot be parsed.
    pub fn struct_info_inline(&self, fields: &[(&str, &str)]) -> Result<StructInfo> {
        let result = fields
            .iter()
            .map(|(ty, name)| Ok((self.types.parse_type(ty)?, *name)))
            .collect::<Result<Vec<_>>>()
            .map(|typed| struct_info_inline(&typed, self.config.quantum));
        self.report(DiagnosticCategory::Layout, result)
    }

    /// Reinterprets `value` as unsigned, honouring [`crate::CheckFlags::STRICT_SIGNS`].
    ///
    /// # Errors
    ///
    /// See [`crate::numeric::to_unsigned`].
    pub fn to_unsigned(&self, value: i64, bits: u32) -> Result<u64> {
        let result = to_unsigned(value, bits, self.config.sign_check());
        self.report(DiagnosticCategory::Numeric, result)
    }

    /// Reinterprets `value` as signed, honouring [`crate::CheckFlags::STRICT_SIGNS`].
    ///
    /// # Errors
    ///
    /// See [`crate::numeric::to_signed`].
    pub fn to_signed(&self, value: u64, bits: u32) -> Result<i64> {
        let result = to_signed(value, bits, self.config.sign_check());
        self.report(DiagnosticCategory::Numeric, result)
    }

    /// Shifts a 64-bit word pair and stores the result in the scratch slot.
    ///
    /// The low word is written at [`Runtime::temp_double_ptr`], the high word 4 bytes after.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidShift`] if `bits > 63`.
    pub fn bitshift64(&mut self, low: u32, high: u32, op: ShiftOp, bits: u32) -> Result<Int64> {
        let scratch = self.temp_double_ptr;
        let result = shift(low, high, op, bits)
            .and_then(|value| self.memory.store_i64(scratch, value).map(|()| value));
        self.report(DiagnosticCategory::Numeric, result)
    }

    /// Registers a function in the table. See [`DispatchTable::register`].
    pub fn register_function<F>(&self, function: F) -> usize
    where
        F: Fn(&[HostValue]) -> Result<HostValue> + Send + Sync + 'static,
    {
        self.table.register(function)
    }

    /// Calls a table function through `signature`.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::InvalidSignature`] if `signature` cannot be parsed
    /// - see [`DispatchTable::call`]
    pub fn dyn_call(&self, signature: &str, index: usize, args: &[HostValue]) -> Result<HostValue> {
        let result = Signature::parse(signature)
            .and_then(|signature| self.table.call(&signature, index, args));
        self.report(DiagnosticCategory::Dispatch, result)
    }

    /// Returns the cached wrapper for a table function.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::InvalidSignature`] if `signature` cannot be parsed
    /// - see [`FuncWrapperCache::wrapper_for`]
    pub fn func_wrapper(&self, index: usize, signature: &str) -> Result<Arc<FuncWrapper>> {
        let result = Signature::parse(signature)
            .and_then(|signature| self.wrappers.wrapper_for(index, &signature));
        self.report(DiagnosticCategory::Dispatch, result)
    }

    /// Reports a warning once per distinct message.
    pub fn warn_once(&self, message: impl Into<String>) -> bool {
        self.diagnostics
            .warn_once(DiagnosticCategory::General, message)
    }

    /// Writes `text` as a NUL-terminated UTF-8 string into the given region.
    ///
    /// # Errors
    ///
    /// See [`LinearMemory::allocate`].
    pub fn alloc_string(&mut self, text: &str, region: RegionKind) -> Result<usize> {
        let mut bytes = encode_string(text);
        bytes.push(0);

        let address = self.allocate(region, bytes.len())?;
        let result = self.memory.write(address, &bytes).map(|()| address);
        self.report(DiagnosticCategory::Codec, result)
    }

    /// Reads a NUL-terminated UTF-8 string.
    ///
    /// # Errors
    ///
    /// See [`LinearMemory::read`]; reading runs until the terminator or the end of memory.
    pub fn read_c_string(&self, address: usize) -> Result<String> {
        self.report(DiagnosticCategory::Codec, self.decode_c_string(address))
    }

    fn decode_c_string(&self, address: usize) -> Result<String> {
        let mut decoder = Utf8Decoder::new();
        let mut units = Vec::new();
        let mut cursor = address;

        loop {
            let byte = self.memory.read(cursor, 1)?[0];
            if byte == 0 {
                break;
            }
            if let Some(unit) = decoder.decode_byte(byte) {
                units.push(unit);
            }
            cursor += 1;
        }

        Ok(String::from_utf16_lossy(&units))
    }

    /// Records a failed operation as an error diagnostic and hands the result back unchanged.
    fn report<T>(&self, category: DiagnosticCategory, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            let diagnostic = Diagnostic::new(DiagnosticSeverity::Error, category, err.to_string());
            let diagnostic = match err {
                Error::InvalidAddress { address, .. } => diagnostic.with_address(*address),
                Error::InvalidTableIndex(index) => diagnostic.with_table_index(*index),
                _ => diagnostic,
            };
            self.diagnostics.push(diagnostic);
        }
        result
    }

    /// Ends the runtime and hands back its diagnostics.
    pub fn finish(self) -> Arc<Diagnostics> {
        if self.diagnostics.has_any() {
            log::debug!("{}", self.diagnostics.summary());
        }
        self.diagnostics
    }
}
