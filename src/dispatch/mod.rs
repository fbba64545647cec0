//! Indirect calls through an integer-indexed function table.
//!
//! # Key Components
//!
//! - [`DispatchTable`] - append-only table of functions, called by index
//! - [`Signature`] - return and parameter type codes of a call
//! - [`FuncWrapperCache`] / [`FuncWrapper`] - memoized callables bound to an index
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use memrt::diagnostics::Diagnostics;
//! use memrt::dispatch::{DispatchTable, FuncWrapperCache, Signature};
//! use memrt::value::HostValue;
//! use memrt::DispatchMode;
//!
//! let table = Arc::new(DispatchTable::new(DispatchMode::SignatureRouted));
//! let index = table.register(|_: &[HostValue]| Ok(HostValue::Void));
//!
//! let cache = FuncWrapperCache::new(table.clone(), Arc::new(Diagnostics::new()));
//! let wrapper = cache.wrapper_for(index, &Signature::parse("v")?)?;
//! wrapper.invoke(&[])?;
//! # Ok::<(), memrt::Error>(())
//! ```

mod signature;
mod table;
mod wrapper;

pub use signature::Signature;
pub use table::{DispatchTable, TableFn, Trampoline, RESERVED_SLOTS};
pub use wrapper::{FuncWrapper, FuncWrapperCache};
