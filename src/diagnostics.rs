//! Diagnostics collection for the runtime.
//!
//! Some conditions are worth reporting without failing the operation that noticed them, for
//! example a function wrapper requested again with a different signature. Those are recorded
//! as [`Diagnostic`] entries in a [`Diagnostics`] container and forwarded to a
//! [`DiagnosticsSink`].
//!
//! # Key Components
//!
//! - [`Diagnostics`] - Thread-safe container with warn-once deduplication
//! - [`Diagnostic`] - Individual entry with severity, category and optional location
//! - [`DiagnosticSeverity`] - Severity level (Info, Warning, Error)
//! - [`DiagnosticCategory`] - Which part of the runtime reported it
//! - [`DiagnosticsSink`] / [`LogSink`] - Where entries are forwarded as they arrive
//!
//! # Usage Examples
//!
//! ```rust
//! use memrt::diagnostics::{DiagnosticCategory, Diagnostics};
//!
//! let diagnostics = Diagnostics::new();
//!
//! assert!(diagnostics.warn_once(DiagnosticCategory::Dispatch, "signature changed"));
//! assert!(!diagnostics.warn_once(DiagnosticCategory::Dispatch, "signature changed"));
//!
//! assert_eq!(diagnostics.warning_count(), 1);
//! ```
//!
//! # Thread Safety
//!
//! Entries live in a `boxcar::Vec` and the warn-once keys in a `DashSet`, so diagnostics can
//! be reported through a shared `Arc<Diagnostics>` without locking.

use std::{
    fmt::{self, Write},
    sync::Arc,
};

use dashmap::DashSet;
use strum::{Display, EnumIter};

/// Severity level of a diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum DiagnosticSeverity {
    /// Informational message, not indicating a problem.
    #[strum(serialize = "INFO")]
    Info,

    /// Something suspicious that did not stop the operation.
    #[strum(serialize = "WARN")]
    Warning,

    /// A failure that was reported rather than returned.
    #[strum(serialize = "ERROR")]
    Error,
}

/// Part of the runtime a diagnostic originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum DiagnosticCategory {
    /// Linear memory, regions and frames
    Memory,
    /// Struct layout and the type registry
    Layout,
    /// Sign conversion and 64-bit emulation
    Numeric,
    /// Function table, trampolines and wrappers
    Dispatch,
    /// String encoding and decoding
    Codec,
    /// Anything else
    General,
}

/// A single diagnostic entry.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level of this diagnostic.
    pub severity: DiagnosticSeverity,

    /// Category indicating the source of this diagnostic.
    pub category: DiagnosticCategory,

    /// Human-readable description of the issue.
    pub message: String,

    /// Optional linear memory address related to the issue.
    pub address: Option<usize>,

    /// Optional function table index related to the issue.
    pub table_index: Option<usize>,
}

impl Diagnostic {
    /// Creates a new diagnostic entry.
    pub fn new(
        severity: DiagnosticSeverity,
        category: DiagnosticCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            address: None,
            table_index: None,
        }
    }

    /// Adds a memory address.
    #[must_use]
    pub fn with_address(mut self, address: usize) -> Self {
        self.address = Some(address);
        self
    }

    /// Adds a function table index.
    #[must_use]
    pub fn with_table_index(mut self, index: usize) -> Self {
        self.table_index = Some(index);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.category, self.message)?;

        if let Some(address) = self.address {
            write!(f, " (address: 0x{address:08x})")?;
        }

        if let Some(index) = self.table_index {
            write!(f, " (table index: {index})")?;
        }

        Ok(())
    }
}

/// Receives every diagnostic as it is recorded.
pub trait DiagnosticsSink: Send + Sync {
    /// Handles one diagnostic.
    fn report(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn report(&self, diagnostic: &Diagnostic) {
        match diagnostic.severity {
            DiagnosticSeverity::Info => log::info!("{diagnostic}"),
            DiagnosticSeverity::Warning => log::warn!("{diagnostic}"),
            DiagnosticSeverity::Error => log::error!("{diagnostic}"),
        }
    }
}

/// Thread-safe container for collecting diagnostic entries.
pub struct Diagnostics {
    entries: boxcar::Vec<Diagnostic>,
    /// Messages already reported through [`Diagnostics::warn_once`]
    seen: DashSet<String>,
    sink: Arc<dyn DiagnosticsSink>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics {
    /// Creates an empty container that forwards to [`LogSink`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_sink(Arc::new(LogSink))
    }

    /// Creates an empty container that forwards to `sink`.
    #[must_use]
    pub fn with_sink(sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            entries: boxcar::Vec::new(),
            seen: DashSet::new(),
            sink,
        }
    }

    /// Adds an informational diagnostic.
    pub fn info(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(DiagnosticSeverity::Info, category, message));
    }

    /// Adds a warning diagnostic.
    pub fn warning(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(
            DiagnosticSeverity::Warning,
            category,
            message,
        ));
    }

    /// Adds an error diagnostic.
    pub fn error(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(Diagnostic::new(
            DiagnosticSeverity::Error,
            category,
            message,
        ));
    }

    /// Adds a warning unless the same message was already reported this way.
    ///
    /// Returns `true` if the warning was recorded.
    pub fn warn_once(&self, category: DiagnosticCategory, message: impl Into<String>) -> bool {
        self.push_once(Diagnostic::new(
            DiagnosticSeverity::Warning,
            category,
            message,
        ))
    }

    /// Adds a diagnostic unless one with the same message was already recorded through this
    /// method.
    ///
    /// Returns `true` if the diagnostic was recorded.
    pub fn push_once(&self, diagnostic: Diagnostic) -> bool {
        if !self.seen.insert(diagnostic.message.clone()) {
            return false;
        }
        self.push(diagnostic);
        true
    }

    /// Adds a diagnostic entry directly and forwards it to the sink.
    pub fn push(&self, diagnostic: Diagnostic) {
        self.sink.report(&diagnostic);
        self.entries.push(diagnostic);
    }

    /// Returns true if any diagnostics have been collected.
    pub fn has_any(&self) -> bool {
        self.entries.count() > 0
    }

    /// Returns true if any error-level diagnostics have been collected.
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, d)| d.severity == DiagnosticSeverity::Error)
    }

    /// Returns true if any warning-level diagnostics have been collected.
    pub fn has_warnings(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, d)| d.severity == DiagnosticSeverity::Warning)
    }

    /// Returns the total number of diagnostics.
    pub fn count(&self) -> usize {
        self.entries.count()
    }

    fn count_severity(&self, severity: DiagnosticSeverity) -> usize {
        self.entries
            .iter()
            .filter(|(_, d)| d.severity == severity)
            .count()
    }

    /// Returns the number of error-level diagnostics.
    pub fn error_count(&self) -> usize {
        self.count_severity(DiagnosticSeverity::Error)
    }

    /// Returns the number of warning-level diagnostics.
    pub fn warning_count(&self) -> usize {
        self.count_severity(DiagnosticSeverity::Warning)
    }

    /// Returns the number of info-level diagnostics.
    pub fn info_count(&self) -> usize {
        self.count_severity(DiagnosticSeverity::Info)
    }

    /// Returns an iterator over all diagnostics in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().map(|(_, d)| d)
    }

    /// Returns diagnostics filtered by category.
    pub fn by_category(&self, category: DiagnosticCategory) -> Vec<&Diagnostic> {
        self.entries
            .iter()
            .filter(|(_, d)| d.category == category)
            .map(|(_, d)| d)
            .collect()
    }

    /// Formats a summary of all diagnostics for display.
    pub fn summary(&self) -> String {
        let mut output = String::new();

        let _ = writeln!(
            output,
            "Diagnostics: {} error(s), {} warning(s), {} info(s)",
            self.error_count(),
            self.warning_count(),
            self.info_count()
        );

        for severity in [DiagnosticSeverity::Error, DiagnosticSeverity::Warning] {
            let mut entries = self.iter().filter(|d| d.severity == severity).peekable();
            if entries.peek().is_none() {
                continue;
            }
            let _ = writeln!(output, "\n{severity}:");
            for diag in entries {
                let _ = writeln!(output, "  {diag}");
            }
        }

        output
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("entries", &self.entries.count())
            .field("seen", &self.seen.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}
