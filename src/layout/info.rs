//! Name-to-offset mapping for struct fields.
//!
//! Generated code refers to struct fields by name, while memory is addressed by byte offset.
//! A [`StructInfo`] bridges the two: it maps every field name to its absolute offset (or to a
//! nested [`StructInfo`] for embedded structs) and records the total size.
//!
//! Two ways to build one are supported:
//!
//! - [`resolve_named_offsets`] pairs a list of names with a registered struct type. The name
//!   list must have exactly as many entries as the type has fields.
//! - [`struct_info_inline`] takes `(type, name)` pairs and computes the layout on the spot.

use crate::{
    layout::{
        calc::compute_layout,
        registry::TypeRegistry,
        types::{StructType, TypeDescriptor},
    },
    numeric::Quantum,
    Error, Result,
};

/// A field name in a named-offset request, optionally expanding an embedded struct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamedField {
    /// A leaf field, mapped to its offset
    Field(String),
    /// An embedded struct field whose own fields are named in turn
    Embedded {
        /// Name the nested mapping is stored under
        name: String,
        /// Names of the embedded struct's fields
        fields: Vec<NamedField>,
    },
}

impl NamedField {
    /// Creates a leaf field.
    pub fn field(name: impl Into<String>) -> Self {
        NamedField::Field(name.into())
    }

    /// Creates an embedded struct field.
    pub fn embedded(name: impl Into<String>, fields: Vec<NamedField>) -> Self {
        NamedField::Embedded {
            name: name.into(),
            fields,
        }
    }

    /// The name this entry is stored under.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            NamedField::Field(name) | NamedField::Embedded { name, .. } => name,
        }
    }
}

impl From<&str> for NamedField {
    fn from(name: &str) -> Self {
        NamedField::Field(name.to_string())
    }
}

/// Location of one named field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldInfo {
    /// Absolute byte offset
    Offset(usize),
    /// Mapping for an embedded struct
    Nested(StructInfo),
}

/// Absolute offsets of named fields plus the total struct size.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructInfo {
    size: usize,
    fields: Vec<(String, FieldInfo)>,
}

impl StructInfo {
    /// Total size of the struct in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldInfo> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, info)| info)
    }

    /// Offset of a leaf field.
    #[must_use]
    pub fn offset(&self, name: &str) -> Option<usize> {
        match self.get(name)? {
            FieldInfo::Offset(offset) => Some(*offset),
            FieldInfo::Nested(_) => None,
        }
    }

    /// Mapping of an embedded struct field.
    #[must_use]
    pub fn nested(&self, name: &str) -> Option<&StructInfo> {
        match self.get(name)? {
            FieldInfo::Nested(info) => Some(info),
            FieldInfo::Offset(_) => None,
        }
    }

    /// Fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldInfo)> {
        self.fields.iter().map(|(name, info)| (name.as_str(), info))
    }

    /// Number of named fields at this level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if there are no named fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Maps `names` onto the fields of the registered struct `type_name`.
///
/// Offsets are absolute: every offset has `base_offset` added. Embedded structs are resolved
/// recursively with their own offset added to the base.
///
/// # Errors
///
/// - [`Error::TypeNotFound`] if `type_name` is not registered
/// - [`Error::LayoutMismatch`] if the number of names differs from the number of fields, or
///   if an embedded entry names a field that is not a struct
///
/// # Examples
///
/// ```rust
/// use memrt::layout::{resolve_named_offsets, IntWidth, NamedField, TypeDescriptor, TypeRegistry};
/// use memrt::numeric::Quantum;
///
/// let registry = TypeRegistry::new(Quantum::WORD);
/// registry.register_struct(
///     "%struct.S",
///     vec![TypeDescriptor::Int(IntWidth::I8), TypeDescriptor::Int(IntWidth::I32)],
///     false,
/// )?;
///
/// let info = resolve_named_offsets(&registry, &["tag".into(), "value".into()], "S", 16)?;
/// assert_eq!(info.offset("tag"), Some(16));
/// assert_eq!(info.offset("value"), Some(20));
/// assert_eq!(info.size(), 8);
/// # Ok::<(), memrt::Error>(())
/// ```
pub fn resolve_named_offsets(
    registry: &TypeRegistry,
    names: &[NamedField],
    type_name: &str,
    base_offset: usize,
) -> Result<StructInfo> {
    let ty = registry
        .get(type_name)
        .ok_or_else(|| Error::TypeNotFound(type_name.to_string()))?;
    resolve_struct(&ty, names, base_offset)
}

fn resolve_struct(ty: &StructType, names: &[NamedField], base_offset: usize) -> Result<StructInfo> {
    let layout = ty.layout();
    if names.len() != ty.fields().len() {
        return Err(Error::LayoutMismatch {
            type_name: ty.display_name(),
            expected: ty.fields().len(),
            found: names.len(),
        });
    }

    let mut fields = Vec::with_capacity(names.len());
    for ((named, field_ty), offset) in names.iter().zip(ty.fields()).zip(&layout.flat_indexes) {
        let absolute = base_offset + offset;
        let info = match named {
            NamedField::Field(_) => FieldInfo::Offset(absolute),
            NamedField::Embedded {
                name,
                fields: nested,
            } => {
                let Some(inner) = field_ty.as_struct() else {
                    return Err(Error::LayoutMismatch {
                        type_name: format!("{}.{name}", ty.display_name()),
                        expected: 0,
                        found: nested.len(),
                    });
                };
                FieldInfo::Nested(resolve_struct(inner, nested, absolute)?)
            }
        };
        fields.push((named.name().to_string(), info));
    }

    Ok(StructInfo {
        size: layout.flat_size,
        fields,
    })
}

/// Builds a [`StructInfo`] from `(type, name)` pairs without a registered type.
///
/// The layout is computed unpacked with the given quantum; offsets start at 0.
#[must_use]
pub fn struct_info_inline(fields: &[(TypeDescriptor, &str)], quantum: Quantum) -> StructInfo {
    let types: Vec<TypeDescriptor> = fields.iter().map(|(ty, _)| ty.clone()).collect();
    let layout = compute_layout(&types, false, quantum);

    StructInfo {
        size: layout.flat_size,
        fields: fields
            .iter()
            .zip(layout.flat_indexes)
            .map(|((_, name), offset)| ((*name).to_string(), FieldInfo::Offset(offset)))
            .collect(),
    }
}
