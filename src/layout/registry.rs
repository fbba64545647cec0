//! Registry of struct types.
//!
//! The [`TypeRegistry`] owns every [`StructType`] the runtime knows about. Named structs are
//! registered once and looked up by name; anonymous shapes are interned so that each distinct
//! `(fields, packed)` combination maps to exactly one shared instance.
//!
//! # Thread Safety
//!
//! - Primary storage is a lock-free `SkipMap` keyed by the type id
//! - Name and shape indices are `DashMap`s
//! - Ids come from an atomic counter
//!
//! # Examples
//!
//! ```rust
//! use memrt::layout::{IntWidth, TypeDescriptor, TypeRegistry};
//! use memrt::numeric::Quantum;
//!
//! let registry = TypeRegistry::new(Quantum::WORD);
//! let point = registry.register_struct(
//!     "%struct.Point",
//!     vec![TypeDescriptor::Int(IntWidth::I32), TypeDescriptor::Int(IntWidth::I32)],
//!     false,
//! )?;
//!
//! assert_eq!(point.layout().flat_size, 8);
//! assert!(registry.get("Point").is_some());
//! assert_eq!(registry.parse_type("Point*")?, TypeDescriptor::Pointer);
//! # Ok::<(), memrt::Error>(())
//! ```

use std::{
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use crossbeam_skiplist::SkipMap;
use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    layout::types::{IntWidth, StructType, StructTypeRc, TypeDescriptor},
    numeric::Quantum,
    Error, Result,
};

/// Prefix used by the compiler for named struct types.
pub const STRUCT_PREFIX: &str = "%struct.";

#[derive(Clone, PartialEq, Eq, Hash)]
struct ShapeKey {
    fields: Vec<TypeDescriptor>,
    packed: bool,
}

/// Thread-safe store of named and anonymous struct types for one quantum.
pub struct TypeRegistry {
    quantum: Quantum,
    /// Primary storage, by id
    types: SkipMap<u32, StructTypeRc>,
    next_id: AtomicU32,
    /// Named types, by the name they were registered with
    by_name: DashMap<String, u32>,
    /// Anonymous shapes
    shapes: DashMap<ShapeKey, StructTypeRc>,
}

impl TypeRegistry {
    /// Creates an empty registry whose layouts are computed for `quantum`.
    #[must_use]
    pub fn new(quantum: Quantum) -> Self {
        TypeRegistry {
            quantum,
            types: SkipMap::new(),
            next_id: AtomicU32::new(1),
            by_name: DashMap::new(),
            shapes: DashMap::new(),
        }
    }

    /// The quantum layouts are computed with.
    #[must_use]
    pub fn quantum(&self) -> Quantum {
        self.quantum
    }

    fn next_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Registers a named struct type.
    ///
    /// Registering the same name again with an identical shape returns the existing type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeInsert`] if the name is already bound to a different shape.
    pub fn register_struct(
        &self,
        name: &str,
        fields: Vec<TypeDescriptor>,
        packed: bool,
    ) -> Result<StructTypeRc> {
        match self.by_name.entry(name.to_string()) {
            Entry::Occupied(entry) => {
                let existing = self
                    .types
                    .get(entry.get())
                    .map(|e| e.value().clone())
                    .ok_or_else(|| Error::TypeInsert(name.to_string()))?;
                if existing.has_shape(&fields, packed) {
                    Ok(existing)
                } else {
                    Err(Error::TypeInsert(format!(
                        "{name} is already registered with a different shape"
                    )))
                }
            }
            Entry::Vacant(entry) => {
                let id = self.next_id();
                let ty = Arc::new(StructType::new(
                    id,
                    Some(name.to_string()),
                    fields,
                    packed,
                    self.quantum,
                ));
                self.types.insert(id, ty.clone());
                entry.insert(id);
                log::trace!(
                    "registered struct {name} (size {}, align {})",
                    ty.layout().flat_size,
                    ty.layout().align_size
                );
                Ok(ty)
            }
        }
    }

    /// Returns the shared anonymous struct type for the given shape, creating it on first use.
    pub fn intern(&self, fields: Vec<TypeDescriptor>, packed: bool) -> StructTypeRc {
        let key = ShapeKey { fields, packed };
        if let Some(existing) = self.shapes.get(&key) {
            return existing.value().clone();
        }

        match self.shapes.entry(key) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let id = self.next_id();
                let ty = Arc::new(StructType::new(
                    id,
                    None,
                    entry.key().fields.clone(),
                    entry.key().packed,
                    self.quantum,
                ));
                self.types.insert(id, ty.clone());
                entry.insert(ty.clone());
                ty
            }
        }
    }

    /// Looks up a named struct.
    ///
    /// Accepts both the full name (`%struct.Point`) and the short name (`Point`).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<StructTypeRc> {
        let id = self
            .by_name
            .get(name)
            .map(|id| *id)
            .or_else(|| {
                self.by_name
                    .get(&format!("{STRUCT_PREFIX}{name}"))
                    .map(|id| *id)
            })
            .or_else(|| {
                name.strip_prefix(STRUCT_PREFIX)
                    .and_then(|short| self.by_name.get(short).map(|id| *id))
            })?;

        self.types.get(&id).map(|entry| entry.value().clone())
    }

    /// Looks up a type by id.
    #[must_use]
    pub fn get_by_id(&self, id: u32) -> Option<StructTypeRc> {
        self.types.get(&id).map(|entry| entry.value().clone())
    }

    /// Parses a textual type name into a descriptor.
    ///
    /// Recognized forms are `i1`/`i8`/`i16`/`i32`/`i64`, `float`, `double`, any name ending in
    /// `*`, `bN` for an N-byte opaque array, and registered struct names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] for anything else.
    pub fn parse_type(&self, name: &str) -> Result<TypeDescriptor> {
        let name = name.trim();
        if name.ends_with('*') {
            return Ok(TypeDescriptor::Pointer);
        }
        match name {
            "float" => return Ok(TypeDescriptor::Float32),
            "double" => return Ok(TypeDescriptor::Float64),
            _ => {}
        }
        if let Ok(width) = IntWidth::from_str(name) {
            return Ok(TypeDescriptor::Int(width));
        }
        if let Some(len) = name.strip_prefix('b').and_then(|n| n.parse::<usize>().ok()) {
            return Ok(TypeDescriptor::RawBytes(len));
        }
        if let Some(ty) = self.get(name) {
            return Ok(TypeDescriptor::Struct(ty));
        }

        Err(Error::UnknownType(name.to_string()))
    }

    /// Number of struct types, named and anonymous.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no type has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Returns an iterator over all types, ordered by id.
    pub fn iter(&self) -> crossbeam_skiplist::map::Iter<'_, u32, StructTypeRc> {
        self.types.iter()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("quantum", &self.quantum.bytes())
            .field("types", &self.types.len())
            .field("named", &self.by_name.len())
            .finish_non_exhaustive()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new(Quantum::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i32_pair() -> Vec<TypeDescriptor> {
        vec![
            TypeDescriptor::Int(IntWidth::I32),
            TypeDescriptor::Int(IntWidth::I32),
        ]
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = TypeRegistry::new(Quantum::WORD);
        let ty = registry.register_struct("%struct.Pair", i32_pair(), false).unwrap();

        assert!(Arc::ptr_eq(&registry.get("%struct.Pair").unwrap(), &ty));
        assert!(Arc::ptr_eq(&registry.get("Pair").unwrap(), &ty));
        assert!(Arc::ptr_eq(&registry.get_by_id(ty.id()).unwrap(), &ty));
        assert!(registry.get("Missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_short_name_registration() {
        let registry = TypeRegistry::new(Quantum::WORD);
        let ty = registry.register_struct("Pair", i32_pair(), false).unwrap();
        assert!(Arc::ptr_eq(&registry.get("%struct.Pair").unwrap(), &ty));
    }

    #[test]
    fn test_reregister_same_shape() {
        let registry = TypeRegistry::new(Quantum::WORD);
        let a = registry.register_struct("Pair", i32_pair(), false).unwrap();
        let b = registry.register_struct("Pair", i32_pair(), false).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reregister_different_shape() {
        let registry = TypeRegistry::new(Quantum::WORD);
        registry.register_struct("Pair", i32_pair(), false).unwrap();
        assert!(matches!(
            registry.register_struct("Pair", i32_pair(), true),
            Err(Error::TypeInsert(_))
        ));
        assert!(matches!(
            registry.register_struct("Pair", vec![TypeDescriptor::Float64], false),
            Err(Error::TypeInsert(_))
        ));
    }

    #[test]
    fn test_intern_shapes() {
        let registry = TypeRegistry::new(Quantum::WORD);
        let a = registry.intern(i32_pair(), false);
        let b = registry.intern(i32_pair(), false);
        let c = registry.intern(i32_pair(), true);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert!(a.name().is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_parse_type() {
        let registry = TypeRegistry::new(Quantum::WORD);
        let pair = registry.register_struct("%struct.Pair", i32_pair(), false).unwrap();

        assert_eq!(registry.parse_type("i32").unwrap(), TypeDescriptor::Int(IntWidth::I32));
        assert_eq!(registry.parse_type("i1").unwrap(), TypeDescriptor::Int(IntWidth::I1));
        assert_eq!(registry.parse_type("float").unwrap(), TypeDescriptor::Float32);
        assert_eq!(registry.parse_type("double").unwrap(), TypeDescriptor::Float64);
        assert_eq!(registry.parse_type("i8*").unwrap(), TypeDescriptor::Pointer);
        assert_eq!(registry.parse_type("%struct.Pair**").unwrap(), TypeDescriptor::Pointer);
        assert_eq!(registry.parse_type("b12").unwrap(), TypeDescriptor::RawBytes(12));
        assert_eq!(registry.parse_type("Pair").unwrap(), TypeDescriptor::Struct(pair));

        assert!(matches!(registry.parse_type("i24"), Err(Error::UnknownType(_))));
        assert!(matches!(registry.parse_type("bogus"), Err(Error::UnknownType(_))));
        assert!(matches!(registry.parse_type("b"), Err(Error::UnknownType(_))));
    }

    #[test]
    fn test_layout_uses_registry_quantum() {
        let registry = TypeRegistry::new(Quantum::BYTE);
        let ty = registry.register_struct("Pair", i32_pair(), false).unwrap();
        assert_eq!(ty.layout().flat_size, 2);
    }
}
