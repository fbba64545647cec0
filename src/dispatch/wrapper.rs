//! Cached callable wrappers around table indices.
//!
//! Host code that wants to hand a table function to something expecting a plain callback asks
//! for a [`FuncWrapper`]. Wrappers are built on first request and cached per index for the
//! lifetime of the cache, so repeated requests return the same `Arc`.

use std::{fmt, sync::Arc};

use dashmap::DashMap;

use crate::{
    diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics},
    dispatch::{signature::Signature, table::DispatchTable},
    value::HostValue,
    Error, Result,
};

/// A callable bound to one table index and signature.
pub struct FuncWrapper {
    table: Arc<DispatchTable>,
    index: usize,
    signature: Signature,
}

impl FuncWrapper {
    /// The wrapped table index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The signature calls are routed through.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Calls the wrapped function, discarding its return value.
    ///
    /// # Errors
    ///
    /// Same as [`DispatchTable::call`].
    pub fn invoke(&self, args: &[HostValue]) -> Result<()> {
        self.table.call(&self.signature, self.index, args)?;
        Ok(())
    }
}

impl fmt::Debug for FuncWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncWrapper")
            .field("index", &self.index)
            .field("signature", &self.signature.as_str())
            .finish()
    }
}

/// Memoizes one [`FuncWrapper`] per table index.
pub struct FuncWrapperCache {
    table: Arc<DispatchTable>,
    wrappers: DashMap<usize, Arc<FuncWrapper>>,
    diagnostics: Arc<Diagnostics>,
}

impl FuncWrapperCache {
    /// Creates an empty cache over `table`.
    #[must_use]
    pub fn new(table: Arc<DispatchTable>, diagnostics: Arc<Diagnostics>) -> Self {
        FuncWrapperCache {
            table,
            wrappers: DashMap::new(),
            diagnostics,
        }
    }

    /// Returns the wrapper for `index`, building it on first request.
    ///
    /// A later request with a different signature still returns the cached wrapper and
    /// reports a one-time warning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTableIndex`] if `index` does not name a registered function.
    pub fn wrapper_for(&self, index: usize, signature: &Signature) -> Result<Arc<FuncWrapper>> {
        if let Some(existing) = self.wrappers.get(&index) {
            let existing = existing.value().clone();
            if existing.signature != *signature {
                self.diagnostics.push_once(
                    Diagnostic::new(
                        DiagnosticSeverity::Warning,
                        DiagnosticCategory::Dispatch,
                        format!(
                            "function {index} wrapped as '{}' but requested as '{signature}'",
                            existing.signature
                        ),
                    )
                    .with_table_index(index),
                );
            }
            return Ok(existing);
        }

        if !self.table.contains(index) {
            return Err(Error::InvalidTableIndex(index));
        }

        Ok(self
            .wrappers
            .entry(index)
            .or_insert_with(|| {
                Arc::new(FuncWrapper {
                    table: self.table.clone(),
                    index,
                    signature: signature.clone(),
                })
            })
            .value()
            .clone())
    }

    /// Number of cached wrappers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    /// Returns `true` if no wrapper has been built yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }
}

impl fmt::Debug for FuncWrapperCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncWrapperCache")
            .field("wrappers", &self.wrappers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI32, Ordering};

    use super::*;
    use crate::{config::DispatchMode, diagnostics::DiagnosticsSink};

    struct Silent;

    impl DiagnosticsSink for Silent {
        fn report(&self, _diagnostic: &Diagnostic) {}
    }

    fn setup() -> (Arc<DispatchTable>, FuncWrapperCache, Arc<Diagnostics>) {
        let table = Arc::new(DispatchTable::new(DispatchMode::SignatureRouted));
        let diagnostics = Arc::new(Diagnostics::with_sink(Arc::new(Silent)));
        let cache = FuncWrapperCache::new(table.clone(), diagnostics.clone());
        (table, cache, diagnostics)
    }

    #[test]
    fn test_wrapper_identity() {
        let (table, cache, diagnostics) = setup();
        let indices: Vec<usize> = (0..3)
            .map(|n| table.register(move |_: &[HostValue]| Ok(HostValue::I32(n))))
            .collect();
        let sig = Signature::parse("i").unwrap();

        let a = cache.wrapper_for(indices[1], &sig).unwrap();
        let b = cache.wrapper_for(indices[1], &sig).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.index(), indices[1]);
        assert_eq!(cache.len(), 1);
        assert_eq!(table.call(&sig, a.index(), &[]).unwrap(), HostValue::I32(1));
        assert!(!diagnostics.has_any());
    }

    #[test]
    fn test_signature_change_warns_once() {
        let (table, cache, diagnostics) = setup();
        let index = table.register(|_: &[HostValue]| Ok(HostValue::Void));

        let first = cache.wrapper_for(index, &Signature::parse("v").unwrap()).unwrap();
        let other = Signature::parse("vi").unwrap();
        let second = cache.wrapper_for(index, &other).unwrap();
        cache.wrapper_for(index, &other).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.signature().as_str(), "v");
        assert_eq!(diagnostics.warning_count(), 1);
        assert_eq!(diagnostics.iter().next().unwrap().table_index, Some(index));
    }

    #[test]
    fn test_invoke_discards_result() {
        let (table, cache, _) = setup();
        let seen = Arc::new(AtomicI32::new(0));
        let sink = seen.clone();
        let index = table.register(move |args: &[HostValue]| {
            sink.store(args[0].as_i32().unwrap_or_default(), Ordering::Relaxed);
            Ok(HostValue::I32(99))
        });

        let wrapper = cache.wrapper_for(index, &Signature::parse("ii").unwrap()).unwrap();
        wrapper.invoke(&[HostValue::I32(5)]).unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 5);
        assert!(wrapper.invoke(&[]).is_err());
    }

    #[test]
    fn test_unknown_index() {
        let (_, cache, _) = setup();
        assert!(matches!(
            cache.wrapper_for(2, &Signature::parse("v").unwrap()),
            Err(Error::InvalidTableIndex(2))
        ));
        assert!(cache.is_empty());
    }
}
