//! Field placement for struct types.
//!
//! Fields are placed in declaration order, each one at the next offset aligned to its
//! effective alignment (`min(natural alignment, quantum)`, or 1 when packed). The struct size
//! is the running offset padded to the largest effective alignment seen.

use crate::{
    layout::types::{StructLayout, TypeDescriptor},
    numeric::{align_up, Quantum},
};

/// Size of a type in bytes under the given quantum.
#[must_use]
pub fn native_type_size(ty: &TypeDescriptor, quantum: Quantum) -> usize {
    ty.native_size(quantum)
}

/// Number of bytes a value of this type occupies as a standalone slot.
///
/// Slots are never smaller than one quantum.
#[must_use]
pub fn native_field_size(ty: &TypeDescriptor, quantum: Quantum) -> usize {
    native_type_size(ty, quantum).max(quantum.bytes())
}

/// Computes the layout of a struct with the given fields.
///
/// # Examples
///
/// ```rust
/// use memrt::layout::{compute_layout, IntWidth, TypeDescriptor};
/// use memrt::numeric::Quantum;
///
/// let fields = [
///     TypeDescriptor::Int(IntWidth::I32),
///     TypeDescriptor::Int(IntWidth::I8),
///     TypeDescriptor::Int(IntWidth::I32),
/// ];
/// let layout = compute_layout(&fields, false, Quantum::WORD);
/// assert_eq!(layout.flat_indexes, vec![0, 4, 8]);
/// assert_eq!(layout.flat_size, 12);
/// assert_eq!(layout.align_size, 4);
/// ```
#[must_use]
pub fn compute_layout(fields: &[TypeDescriptor], packed: bool, quantum: Quantum) -> StructLayout {
    let mut flat_indexes = Vec::with_capacity(fields.len());
    let mut running = 0usize;
    let mut align_size = 1usize;

    for field in fields {
        let size = field.native_size(quantum);
        let effective = if packed {
            1
        } else {
            field.natural_align(quantum).min(quantum.bytes()).max(1)
        };
        align_size = align_size.max(effective);

        let offset = align_up(running, effective);
        flat_indexes.push(offset);
        running = offset + size;
    }

    let flat_size = align_up(running, align_size);
    let (flat_factor, needs_flattening) = match flat_indexes.len() {
        0 | 1 => (flat_size, flat_size != 1),
        _ => match uniform_stride(&flat_indexes) {
            Some(stride) => (stride, stride != 1),
            // no common stride, so there is never a fast path
            None => (flat_size, true),
        },
    };

    StructLayout {
        flat_size,
        align_size,
        flat_indexes,
        flat_factor,
        needs_flattening,
    }
}

/// Common delta between consecutive offsets, if there are at least two and all agree.
fn uniform_stride(offsets: &[usize]) -> Option<usize> {
    let mut deltas = offsets.windows(2).map(|pair| pair[1] - pair[0]);
    let first = deltas.next()?;
    deltas.all(|delta| delta == first).then_some(first)
}
