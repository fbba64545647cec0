//! Type descriptors and struct types used for layout computation.
//!
//! [`TypeDescriptor`] is a closed set of the shapes a field can take. Anything else is
//! rejected when the descriptor is built (see [`crate::layout::TypeRegistry::parse_type`]),
//! so layout computation itself never has to deal with unrecognized types.
//!
//! [`StructType`] is immutable once created and shared through [`StructTypeRc`]. Struct
//! descriptors compare by identity: two `TypeDescriptor::Struct` values are equal only if they
//! refer to the same interned `StructType`.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use strum::{Display, EnumIter, EnumString};

use crate::{
    layout::calc::compute_layout,
    numeric::Quantum,
};

/// A reference-counted pointer to an immutable [`StructType`]
pub type StructTypeRc = Arc<StructType>;

/// Width of an integer field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter)]
pub enum IntWidth {
    /// `i1` - a boolean, stored in one byte
    #[strum(serialize = "i1")]
    I1,
    /// `i8`
    #[strum(serialize = "i8")]
    I8,
    /// `i16`
    #[strum(serialize = "i16")]
    I16,
    /// `i32`
    #[strum(serialize = "i32")]
    I32,
    /// `i64`
    #[strum(serialize = "i64")]
    I64,
}

impl IntWidth {
    /// Number of value bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            IntWidth::I1 => 1,
            IntWidth::I8 => 8,
            IntWidth::I16 => 16,
            IntWidth::I32 => 32,
            IntWidth::I64 => 64,
        }
    }

    /// Number of bytes occupied in memory.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            IntWidth::I1 | IntWidth::I8 => 1,
            IntWidth::I16 => 2,
            IntWidth::I32 => 4,
            IntWidth::I64 => 8,
        }
    }
}

/// The type of a single struct field or memory value.
#[derive(Clone, Debug)]
pub enum TypeDescriptor {
    /// Integer of the given width
    Int(IntWidth),
    /// 32-bit float (`float`)
    Float32,
    /// 64-bit float (`double`)
    Float64,
    /// Pointer into linear memory; one quantum wide
    Pointer,
    /// Embedded struct with its own precomputed layout
    Struct(StructTypeRc),
    /// Opaque byte array (`bN`, like `[N x i8]`), byte aligned
    RawBytes(usize),
}

impl TypeDescriptor {
    /// Returns `true` for integer and float types.
    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Int(_) | TypeDescriptor::Float32 | TypeDescriptor::Float64
        )
    }

    /// Returns `true` for pointers.
    #[must_use]
    pub fn is_pointer(&self) -> bool {
        matches!(self, TypeDescriptor::Pointer)
    }

    /// Returns the embedded struct type, if this is a struct field.
    #[must_use]
    pub fn as_struct(&self) -> Option<&StructTypeRc> {
        match self {
            TypeDescriptor::Struct(ty) => Some(ty),
            _ => None,
        }
    }

    /// Size of the type in bytes, as a C compiler targeting this quantum would lay it out.
    ///
    /// With a quantum of 1 every number and pointer occupies exactly one memory cell.
    #[must_use]
    pub fn native_size(&self, quantum: Quantum) -> usize {
        match self {
            TypeDescriptor::Struct(ty) => ty.layout().flat_size,
            TypeDescriptor::RawBytes(len) => *len,
            _ if quantum == Quantum::BYTE => 1,
            TypeDescriptor::Int(width) => width.bytes(),
            TypeDescriptor::Float32 => 4,
            TypeDescriptor::Float64 => 8,
            TypeDescriptor::Pointer => quantum.bytes(),
        }
    }

    /// Natural alignment of the type before it is capped to the quantum.
    #[must_use]
    pub fn natural_align(&self, quantum: Quantum) -> usize {
        match self {
            TypeDescriptor::Struct(ty) => ty.layout().align_size,
            TypeDescriptor::RawBytes(_) => 1,
            other => other.native_size(quantum),
        }
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeDescriptor::Int(a), TypeDescriptor::Int(b)) => a == b,
            (TypeDescriptor::Float32, TypeDescriptor::Float32)
            | (TypeDescriptor::Float64, TypeDescriptor::Float64)
            | (TypeDescriptor::Pointer, TypeDescriptor::Pointer) => true,
            (TypeDescriptor::Struct(a), TypeDescriptor::Struct(b)) => Arc::ptr_eq(a, b),
            (TypeDescriptor::RawBytes(a), TypeDescriptor::RawBytes(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            TypeDescriptor::Int(width) => width.hash(state),
            TypeDescriptor::Struct(ty) => std::ptr::hash(Arc::as_ptr(ty), state),
            TypeDescriptor::RawBytes(len) => len.hash(state),
            TypeDescriptor::Float32 | TypeDescriptor::Float64 | TypeDescriptor::Pointer => {}
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Int(width) => write!(f, "{width}"),
            TypeDescriptor::Float32 => write!(f, "float"),
            TypeDescriptor::Float64 => write!(f, "double"),
            TypeDescriptor::Pointer => write!(f, "i8*"),
            TypeDescriptor::Struct(ty) => write!(f, "{}", ty.display_name()),
            TypeDescriptor::RawBytes(len) => write!(f, "b{len}"),
        }
    }
}

impl From<IntWidth> for TypeDescriptor {
    fn from(width: IntWidth) -> Self {
        TypeDescriptor::Int(width)
    }
}

impl From<StructTypeRc> for TypeDescriptor {
    fn from(ty: StructTypeRc) -> Self {
        TypeDescriptor::Struct(ty)
    }
}

/// Derived placement information of a struct type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructLayout {
    /// Total size in bytes, padded to `align_size`
    pub flat_size: usize,
    /// Largest effective field alignment (1 for packed or empty structs)
    pub align_size: usize,
    /// Byte offset of every field, in declaration order
    pub flat_indexes: Vec<usize>,
    /// Common stride between consecutive fields, or `flat_size` when there is none
    pub flat_factor: usize,
    /// `true` when `flat_factor != 1`; hint for array-of-struct fast paths
    pub needs_flattening: bool,
}

/// An immutable struct type: ordered fields, packing and the computed layout.
///
/// Instances are created through [`crate::layout::TypeRegistry`], which caches them so that
/// each distinct shape exists once.
#[derive(Debug)]
pub struct StructType {
    id: u32,
    name: Option<String>,
    fields: Vec<TypeDescriptor>,
    packed: bool,
    layout: StructLayout,
}

impl StructType {
    pub(crate) fn new(
        id: u32,
        name: Option<String>,
        fields: Vec<TypeDescriptor>,
        packed: bool,
        quantum: Quantum,
    ) -> Self {
        let layout = compute_layout(&fields, packed, quantum);
        StructType {
            id,
            name,
            fields,
            packed,
            layout,
        }
    }

    /// Registry-assigned identifier, unique per registry.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The registered name, `None` for anonymous shapes.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name for messages; anonymous structs are shown by id.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("<anon#{}>", self.id),
        }
    }

    /// Field types in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[TypeDescriptor] {
        &self.fields
    }

    /// Whether the struct is packed (all fields byte aligned).
    #[must_use]
    pub fn is_packed(&self) -> bool {
        self.packed
    }

    /// The computed layout.
    #[must_use]
    pub fn layout(&self) -> &StructLayout {
        &self.layout
    }

    /// Returns `true` if this struct has exactly the given fields and packing.
    #[must_use]
    pub fn has_shape(&self, fields: &[TypeDescriptor], packed: bool) -> bool {
        self.packed == packed && self.fields == fields
    }
}
