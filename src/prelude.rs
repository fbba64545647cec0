//! # memrt Prelude
//!
//! Glob-import this module to get the types needed to build a runtime, allocate memory,
//! describe structs and call through the function table.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all memrt operations
pub use crate::Error;

/// The result type used throughout memrt
pub use crate::Result;

// ================================================================================================
// Runtime and Configuration
// ================================================================================================

pub use crate::{CheckFlags, DispatchMode, MemoryConfig, Runtime, RuntimeBuilder, RuntimeConfig};

// ================================================================================================
// Memory
// ================================================================================================

pub use crate::memory::{
    DoublingGrower, FixedMemory, LinearMemory, MemoryGrower, RegionKind, StackFrame,
};

// ================================================================================================
// Layout
// ================================================================================================

pub use crate::layout::{
    IntWidth, NamedField, StructInfo, StructLayout, StructTypeRc, TypeDescriptor, TypeRegistry,
};

// ================================================================================================
// Numerics
// ================================================================================================

pub use crate::numeric::{align_up, BitwiseOp, Int64, Quantum, ShiftOp, SignCheck};

// ================================================================================================
// Dispatch and Values
// ================================================================================================

pub use crate::dispatch::{DispatchTable, FuncWrapper, FuncWrapperCache, Signature};
pub use crate::value::{HostValue, ValueKind};

// ================================================================================================
// Diagnostics
// ================================================================================================

pub use crate::diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics};
