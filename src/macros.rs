#![allow(unused_macros)]

/// Helper macro for locking items
///
/// ```rust, ignore
///  let mut data = lock!(my_mutex);
///  data.some_field = 42;
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock.lock().expect("Failed to acquire lock")
    };
}

/// Helper macro for an invariant check that only runs when assertions are enabled
///
/// Evaluates to `Err(AssertionFailure)` from the enclosing function when the flags contain
/// [`crate::CheckFlags::ASSERTIONS`] and the condition is false.
///
/// ```rust, ignore
///  check_assert!(self.checks, top < limit, "stack top 0x{:x} reached limit", top);
/// ```
macro_rules! check_assert {
    ($checks:expr, $cond:expr, $($msg:tt)+) => {
        if $checks.contains(crate::CheckFlags::ASSERTIONS) && !($cond) {
            return Err(assertion_error!($($msg)+));
        }
    };
}
