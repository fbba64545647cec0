//! Struct layout computation and the struct type registry.
//!
//! Layouts reproduce the placement rules of the target ABI: each field is aligned to the
//! smaller of its natural alignment and the runtime quantum, and the struct is padded to its
//! largest field alignment. Packed structs place every field at byte granularity.
//!
//! # Key Components
//!
//! - [`TypeDescriptor`] / [`IntWidth`] - the closed set of field types
//! - [`StructType`] / [`StructLayout`] - immutable struct types and their computed placement
//! - [`compute_layout`] - the placement algorithm
//! - [`TypeRegistry`] - named and interned anonymous struct types
//! - [`resolve_named_offsets`] / [`struct_info_inline`] - field name to offset mapping

mod calc;
mod info;
mod registry;
mod types;

pub use calc::{compute_layout, native_field_size, native_type_size};
pub use info::{resolve_named_offsets, struct_info_inline, FieldInfo, NamedField, StructInfo};
pub use registry::{TypeRegistry, STRUCT_PREFIX};
pub use types::{IntWidth, StructLayout, StructType, StructTypeRc, TypeDescriptor};
