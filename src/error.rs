use thiserror::Error;

use crate::memory::RegionKind;

macro_rules! assertion_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::AssertionFailure {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::AssertionFailure {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every failure in `memrt` is local and synchronous: the operation that detects the problem
/// aborts and hands the error back to its caller, and no partial state is retained. A failed
/// allocation leaves the region's `top` where it was, a failed layout computation registers
/// nothing.
///
/// # Error Categories
///
/// ## Memory Errors
/// - [`Error::OutOfMemory`] - A region limit would be exceeded
/// - [`Error::AssertionFailure`] - An invariant check failed (only with assertions enabled)
/// - [`Error::FrameOrder`] - Stack frames were closed out of LIFO order
/// - [`Error::InvalidAddress`] - Access outside of the linear buffer
///
/// ## Layout Errors
/// - [`Error::LayoutMismatch`] - Named fields do not match a registered struct type
/// - [`Error::TypeNotFound`] - A struct name is not registered
/// - [`Error::UnknownType`] - A textual type name could not be parsed
/// - [`Error::TypeInsert`] - A struct name is already registered with another shape
///
/// ## Numeric Errors
/// - [`Error::SignConversion`] - Strict sign conversion would change the value
/// - [`Error::InvalidBitWidth`] - Bit width outside of `1..=64`
/// - [`Error::InvalidShift`] - Shift amount outside of `0..=63`
///
/// ## Dispatch Errors
/// - [`Error::ArityMismatch`] - Argument count does not fit the call signature
/// - [`Error::InvalidSignature`] - Signature string contains unknown type codes
/// - [`Error::InvalidTableIndex`] - Index does not name a registered function
///
/// # Examples
///
/// ```rust
/// use memrt::{Error, RuntimeBuilder};
///
/// let mut runtime = RuntimeBuilder::new().stack_size(64).build()?;
///
/// match runtime.stack_alloc(1024) {
///     Ok(addr) => println!("allocated at {addr}"),
///     Err(Error::OutOfMemory { region, requested, .. }) => {
///         eprintln!("{region} exhausted while allocating {requested} bytes");
///     }
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// # Ok::<(), memrt::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A memory region cannot satisfy an allocation.
    ///
    /// For the stack region this is raised as soon as the bump pointer would pass the limit.
    /// For the static region the grow collaborator is asked once for more memory; the error is
    /// only raised when that retry still does not fit.
    #[error("Out of memory in {region} region - requested {requested} bytes at top 0x{top:x} (limit 0x{limit:x})")]
    OutOfMemory {
        /// The region that was exhausted
        region: RegionKind,
        /// The number of bytes that were requested
        requested: usize,
        /// The region top at the time of the request
        top: usize,
        /// The region limit at the time of the request
        limit: usize,
    },

    /// A runtime invariant check failed.
    ///
    /// These checks are only performed when [`crate::CheckFlags::ASSERTIONS`] is enabled.
    /// The error includes the source location where the check fired.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the violated invariant
    /// * `file` - Source file where the check fired
    /// * `line` - Source line where the check fired
    #[error("Assertion failed - {file}:{line}: {message}")]
    AssertionFailure {
        /// The message describing the failed check
        message: String,
        /// The source file in which this error occurred
        file: &'static str,
        /// The source line in which this error occurred
        line: u32,
    },

    /// A stack frame was closed while a frame opened after it was still live.
    #[error("Stack frames must be closed in LIFO order - expected depth {expected_depth}, got {found_depth}")]
    FrameOrder {
        /// The depth of the innermost open frame
        expected_depth: usize,
        /// The depth of the frame that was passed to `stack_exit`
        found_depth: usize,
    },

    /// An access touched bytes outside of the linear memory buffer.
    #[error("Invalid memory access at 0x{address:x} ({size} bytes)")]
    InvalidAddress {
        /// Start address of the access
        address: usize,
        /// Number of bytes accessed
        size: usize,
    },

    /// The named field list does not line up with the registered struct type.
    ///
    /// This usually means the name refers to a stale or duplicated struct definition, so the
    /// offsets cannot be trusted.
    #[error("Number of named fields must match the type for {type_name} - expected {expected}, got {found}")]
    LayoutMismatch {
        /// Name of the struct type that was resolved
        type_name: String,
        /// Field count of the registered type
        expected: usize,
        /// Number of names supplied
        found: usize,
    },

    /// No struct type with this name is registered.
    #[error("Failed to find type in TypeRegistry - {0}")]
    TypeNotFound(String),

    /// A textual type name does not describe any known type.
    #[error("Unclear type: {0}")]
    UnknownType(String),

    /// A struct name is already registered with a different shape.
    #[error("Failed to insert new type into TypeRegistry - {0}")]
    TypeInsert(String),

    /// Strict sign conversion would have changed the value.
    #[error("Sign conversion of {value} to {bits} bits would lose information")]
    SignConversion {
        /// The value that was converted
        value: i128,
        /// The target width
        bits: u32,
    },

    /// Bit width must be within `1..=64`.
    #[error("Unsupported bit width - {0}")]
    InvalidBitWidth(u32),

    /// Shift amount must be within `0..=63`.
    #[error("Unsupported 64-bit shift amount - {0}")]
    InvalidShift(u32),

    /// The number of call arguments does not match the signature.
    #[error("Call through signature '{signature}' expects {expected} arguments, got {found}")]
    ArityMismatch {
        /// The signature string used for the call
        signature: String,
        /// Number of arguments the signature requires
        expected: usize,
        /// Number of arguments supplied
        found: usize,
    },

    /// A signature string contains an unknown type code or is empty.
    #[error("Invalid call signature - '{0}'")]
    InvalidSignature(String),

    /// The table index does not refer to a registered function.
    #[error("Invalid function table index - {0}")]
    InvalidTableIndex(usize),

    /// The runtime configuration is inconsistent.
    #[error("Invalid configuration - {0}")]
    InvalidConfig(String),
}
