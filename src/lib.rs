// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # memrt
//!
//! A support runtime for code produced by a compiler backend that targets a flat, byte
//! addressed linear memory. `memrt` provides the pieces such generated code expects from its
//! host: bump-allocated stack and static regions, C-compatible struct layout, 64-bit integer
//! emulation on 32-bit word pairs, signedness conversion, indirect calls through a function
//! table, and UTF-8 string transport in and out of memory.
//!
//! ## Features
//!
//! - **Linear memory** - stack frames with LIFO checking, a growable static region, typed loads
//!   and stores
//! - **Struct layout** - quantum-aware field placement, a thread-safe type registry, named
//!   field offsets with nested embedding
//! - **Int64 emulation** - bit-exact 64-bit shifts on `(low, high)` pairs and the
//!   double-approximated helpers generated code relies on
//! - **Dispatch** - an append-only function table with signature-routed calls and a memoized
//!   wrapper cache
//! - **Diagnostics** - deduplicated warnings forwarded to the `log` facade
//!
//! ## Quick Start
//!
//! ```rust
//! use memrt::prelude::*;
//!
//! let mut runtime = RuntimeBuilder::new().for_debug().build()?;
//!
//! // stack frames
//! let frame = runtime.stack_enter(0)?;
//! let slot = runtime.stack_alloc(8)?;
//! runtime.memory_mut().store_i64(slot, Int64::from_i64(-2))?;
//! assert_eq!(runtime.memory().load_i64(slot)?.to_i64(), -2);
//! runtime.stack_exit(frame)?;
//!
//! // indirect calls
//! let index = runtime.register_function(|args: &[HostValue]| {
//!     Ok(HostValue::I32(args[0].as_i32().unwrap_or(0) * 2))
//! });
//! assert_eq!(runtime.dyn_call("ii", index, &[HostValue::I32(21)])?, HostValue::I32(42));
//! # Ok::<(), memrt::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`numeric`] - alignment, sign conversion and Int64 emulation
//! - [`layout`] - struct types, layouts and named offsets
//! - [`memory`] - the linear memory and its regions
//! - [`dispatch`] - the function table and wrapper cache
//! - [`codec`] - UTF-8 transcoding
//! - [`runtime`] - the [`Runtime`] context tying everything together
//! - [`Error`] and [`Result`] - error handling
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. Errors are raised synchronously to the caller
//! and never leave partial state behind; see [`Error`] for the categories.
//!
//! ## Concurrency
//!
//! [`dispatch::DispatchTable`], [`layout::TypeRegistry`] and [`diagnostics::Diagnostics`] are
//! `Send + Sync` and may be shared across threads. [`memory::LinearMemory`] is owned by one
//! [`Runtime`] and mutated through `&mut`.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use memrt::prelude::*;
///
/// let runtime = Runtime::new(RuntimeConfig::default())?;
/// assert_eq!(runtime.quantum(), Quantum::WORD);
/// # Ok::<(), memrt::Error>(())
/// ```
pub mod prelude;

pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod layout;
pub mod memory;
pub mod numeric;
pub mod runtime;
pub mod value;

/// `memrt` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `memrt` Error type
///
/// # Examples
///
/// ```rust
/// use memrt::{Error, RuntimeBuilder};
///
/// match RuntimeBuilder::new().quantum(3).build() {
///     Err(Error::InvalidConfig(message)) => println!("rejected: {message}"),
///     Err(e) => println!("Error: {e}"),
///     Ok(_) => unreachable!(),
/// }
/// ```
pub use error::Error;

pub use config::{CheckFlags, DispatchMode, MemoryConfig, RuntimeConfig};
pub use runtime::{Runtime, RuntimeBuilder};
