//! The runtime context tying memory, layout, numeric helpers and dispatch together.
//!
//! A [`Runtime`] is the single object a generated program talks to. It owns the linear memory
//! and the struct type registry, shares the function table and diagnostics, and reserves an
//! 8-byte static scratch slot used to hand 64-bit results back through memory.
//!
//! # Key Components
//!
//! - [`RuntimeBuilder`] - validated construction from a [`crate::RuntimeConfig`]
//! - [`Runtime`] - the context object
//!
//! # Example
//!
//! ```rust
//! use memrt::layout::NamedField;
//! use memrt::RuntimeBuilder;
//!
//! let mut runtime = RuntimeBuilder::new().for_debug().build()?;
//! runtime.register_struct("%struct.Pair", &["i32", "i8"], false)?;
//!
//! let info = runtime.resolve_named_offsets(
//!     &[NamedField::field("key"), NamedField::field("tag")],
//!     "Pair",
//!     0,
//! )?;
//! assert_eq!(info.offset("tag"), Some(4));
//!
//! let frame = runtime.stack_enter(0)?;
//! let pair = runtime.stack_alloc(info.size())?;
//! runtime.memory_mut().store_i32(pair, 7)?;
//! runtime.stack_exit(frame)?;
//! # Ok::<(), memrt::Error>(())
//! ```

mod builder;
mod context;

pub use builder::RuntimeBuilder;
pub use context::Runtime;
