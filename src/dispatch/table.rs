//! The indirect call table.
//!
//! Compiled code has no native function pointers; it stores table indices instead. Each
//! registration appends the callable followed by one padding slot, so every function index is
//! even. The first slot pair is reserved and index 0 acts as the null function pointer.
//!
//! ```text
//! index:  0     1     2     3     4     5
//!        [rsv] [rsv] [f0]  [pad] [f1]  [pad] ...
//! ```
//!
//! # Dispatch Modes
//!
//! - [`DispatchMode::Direct`] calls the slot's callable.
//! - [`DispatchMode::SignatureRouted`] calls a trampoline chosen by the signature string. A
//!   generic trampoline is installed the first time a signature is seen; callers can
//!   replace it with [`DispatchTable::install_trampoline`].
//!
//! # Thread Safety
//!
//! Slots live in a `boxcar::Vec` and are never removed, so lookups are lock-free. Only
//! registration takes the internal mutex, which keeps each function and its padding slot
//! adjacent.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use dashmap::DashMap;

use crate::{config::DispatchMode, dispatch::signature::Signature, value::HostValue, Error, Result};

/// A function stored in the table.
pub type TableFn = Arc<dyn Fn(&[HostValue]) -> Result<HostValue> + Send + Sync>;

/// Per-signature call adapter used in [`DispatchMode::SignatureRouted`] mode.
///
/// Receives the table, the callee index and the call arguments.
pub type Trampoline =
    Arc<dyn Fn(&DispatchTable, usize, &[HostValue]) -> Result<HostValue> + Send + Sync>;

/// Number of reserved slots at the start of the table.
pub const RESERVED_SLOTS: usize = 2;

enum Slot {
    Function(TableFn),
    Padding,
}

/// Append-only table of callable functions.
pub struct DispatchTable {
    slots: boxcar::Vec<Slot>,
    register_lock: Mutex<()>,
    mode: DispatchMode,
    trampolines: DashMap<String, Trampoline>,
}

impl DispatchTable {
    /// Creates an empty table with the reserved slot pair in place.
    #[must_use]
    pub fn new(mode: DispatchMode) -> Self {
        let slots = boxcar::Vec::new();
        for _ in 0..RESERVED_SLOTS {
            slots.push(Slot::Padding);
        }
        DispatchTable {
            slots,
            register_lock: Mutex::new(()),
            mode,
            trampolines: DashMap::new(),
        }
    }

    /// The dispatch mode chosen at construction.
    #[must_use]
    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Registers a function and returns its index.
    ///
    /// Indices are even and never reused.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use memrt::dispatch::{DispatchTable, Signature};
    /// use memrt::value::HostValue;
    /// use memrt::DispatchMode;
    ///
    /// let table = DispatchTable::new(DispatchMode::Direct);
    /// let index = table.register(|args: &[HostValue]| {
    ///     let a = args[0].as_i32().unwrap_or(0);
    ///     Ok(HostValue::I32(a * 2))
    /// });
    /// assert_eq!(index, 2);
    ///
    /// let result = table.call(&Signature::parse("ii")?, index, &[HostValue::I32(21)])?;
    /// assert_eq!(result, HostValue::I32(42));
    /// # Ok::<(), memrt::Error>(())
    /// ```
    pub fn register<F>(&self, function: F) -> usize
    where
        F: Fn(&[HostValue]) -> Result<HostValue> + Send + Sync + 'static,
    {
        self.register_fn(Arc::new(function))
    }

    /// Registers an already shared function and returns its index.
    pub fn register_fn(&self, function: TableFn) -> usize {
        let _guard = lock!(self.register_lock);
        let index = self.slots.push(Slot::Function(function));
        self.slots.push(Slot::Padding);
        debug_assert_eq!(index % 2, 0);

        log::trace!("registered table function at index {index}");
        index
    }

    /// Returns the function at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTableIndex`] for reserved, padding and unused indices.
    pub fn get(&self, index: usize) -> Result<TableFn> {
        match self.slots.get(index) {
            Some(Slot::Function(function)) => Ok(function.clone()),
            _ => Err(Error::InvalidTableIndex(index)),
        }
    }

    /// Returns `true` if `index` names a registered function.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Slot::Function(_)))
    }

    /// Calls the function at `index` with `args`.
    ///
    /// # Errors
    ///
    /// - [`Error::ArityMismatch`] if `args.len() != signature.arity() - 1`
    /// - [`Error::InvalidTableIndex`] if `index` does not name a function
    /// - any error returned by the function itself
    pub fn call(
        &self,
        signature: &Signature,
        index: usize,
        args: &[HostValue],
    ) -> Result<HostValue> {
        signature.check_args(args)?;

        match self.mode {
            DispatchMode::Direct => {
                let function = self.get(index)?;
                function(args)
            }
            DispatchMode::SignatureRouted => {
                let trampoline = self.trampoline(signature);
                trampoline(self, index, args)
            }
        }
    }

    /// Returns the trampoline for `signature`, installing the generic one if none exists.
    pub fn trampoline(&self, signature: &Signature) -> Trampoline {
        if let Some(existing) = self.trampolines.get(signature.as_str()) {
            return existing.value().clone();
        }
        self.trampolines
            .entry(signature.as_str().to_string())
            .or_insert_with(|| {
                log::trace!("installing generic trampoline for '{signature}'");
                generic_trampoline()
            })
            .value()
            .clone()
    }

    /// Installs a trampoline for `signature`, replacing any previous one.
    pub fn install_trampoline(&self, signature: &Signature, trampoline: Trampoline) {
        self.trampolines
            .insert(signature.as_str().to_string(), trampoline);
    }

    /// Total number of slots, including reserved and padding slots.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.count()
    }

    /// Number of registered functions.
    #[must_use]
    pub fn function_count(&self) -> usize {
        (self.slots.count() - RESERVED_SLOTS) / 2
    }
}

fn generic_trampoline() -> Trampoline {
    Arc::new(|table: &DispatchTable, index: usize, args: &[HostValue]| {
        let function = table.get(index)?;
        function(args)
    })
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("mode", &self.mode)
            .field("functions", &self.function_count())
            .field("trampolines", &self.trampolines.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread,
    };

    use super::*;

    fn add(args: &[HostValue]) -> Result<HostValue> {
        let a = args[0].as_i32().unwrap_or_default();
        let b = args[1].as_i32().unwrap_or_default();
        Ok(HostValue::I32(a + b))
    }

    #[test]
    fn test_register_indices() {
        let table = DispatchTable::new(DispatchMode::Direct);
        let a = table.register(add);
        let b = table.register(add);
        let c = table.register(add);
        assert_eq!((a, b, c), (2, 4, 6));
        assert_eq!(table.function_count(), 3);
        assert_eq!(table.slot_count(), 8);
    }

    #[test]
    fn test_call_modes() {
        for mode in [DispatchMode::Direct, DispatchMode::SignatureRouted] {
            let table = DispatchTable::new(mode);
            let index = table.register(add);
            let sig = Signature::parse("iii").unwrap();
            let result = table
                .call(&sig, index, &[HostValue::I32(2), HostValue::I32(40)])
                .unwrap();
            assert_eq!(result, HostValue::I32(42), "{mode}");
        }
    }

    #[test]
    fn test_arity_mismatch() {
        let table = DispatchTable::new(DispatchMode::SignatureRouted);
        let index = table.register(add);
        let sig = Signature::parse("iii").unwrap();
        assert!(matches!(
            table.call(&sig, index, &[HostValue::I32(2)]),
            Err(Error::ArityMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_indices() {
        let table = DispatchTable::new(DispatchMode::Direct);
        let index = table.register(add);
        let sig = Signature::parse("v").unwrap();

        for bad in [0, 1, index + 1, 100] {
            assert!(
                matches!(table.call(&sig, bad, &[]), Err(Error::InvalidTableIndex(i)) if i == bad),
                "{bad}"
            );
        }
        assert!(table.contains(index));
        assert!(!table.contains(0));
    }

    #[test]
    fn test_custom_trampoline() {
        let table = DispatchTable::new(DispatchMode::SignatureRouted);
        let index = table.register(add);
        let sig = Signature::parse("iii").unwrap();

        let routed = Arc::new(AtomicUsize::new(0));
        let counter = routed.clone();
        table.install_trampoline(
            &sig,
            Arc::new(move |table: &DispatchTable, index: usize, args: &[HostValue]| {
                counter.fetch_add(1, Ordering::Relaxed);
                (table.get(index)?)(args)
            }),
        );

        table
            .call(&sig, index, &[HostValue::I32(1), HostValue::I32(1)])
            .unwrap();
        assert_eq!(routed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_generic_trampoline_is_shared() {
        let table = DispatchTable::new(DispatchMode::SignatureRouted);
        let sig = Signature::parse("vi").unwrap();
        let a = table.trampoline(&sig);
        let b = table.trampoline(&sig);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_reentrant_call() {
        let table = Arc::new(DispatchTable::new(DispatchMode::SignatureRouted));
        let inner = table.register(|_: &[HostValue]| Ok(HostValue::I32(7)));
        let weak = Arc::downgrade(&table);
        let outer = table.register(move |_: &[HostValue]| {
            let table = weak.upgrade().ok_or(Error::InvalidTableIndex(inner))?;
            table.call(&Signature::parse("i")?, inner, &[])
        });

        let result = table.call(&Signature::parse("i").unwrap(), outer, &[]).unwrap();
        assert_eq!(result, HostValue::I32(7));
    }

    #[test]
    fn test_concurrent_registration_keeps_pairs() {
        let table = Arc::new(DispatchTable::new(DispatchMode::Direct));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = table.clone();
                thread::spawn(move || (0..50).map(|_| table.register(add)).collect::<Vec<_>>())
            })
            .collect();

        let mut indices: Vec<usize> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        indices.sort_unstable();
        indices.dedup();

        assert_eq!(indices.len(), 400);
        assert!(indices.iter().all(|i| i % 2 == 0 && table.contains(*i)));
    }
}
