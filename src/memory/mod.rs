//! Linear memory with a stack region and a static region.
//!
//! # Key Components
//!
//! - [`LinearMemory`] - the byte buffer, both regions, frames and typed access
//! - [`MemoryRegion`] / [`RegionKind`] - bump allocation bookkeeping
//! - [`AllocPolicy`] - compile-time selection of zero-fill and growth behaviour
//! - [`StackFrame`] - LIFO frame tokens
//! - [`MemoryGrower`] - host collaborator deciding how far the memory may grow

mod frame;
mod grow;
mod linear;
mod region;

pub use frame::StackFrame;
pub use grow::{DoublingGrower, FixedMemory, MemoryGrower};
pub use linear::LinearMemory;
pub use region::{AllocPolicy, MemoryRegion, RegionKind, StackPolicy, StaticPolicy};
