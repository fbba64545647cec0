//! Stack frame tokens.

/// Token returned by [`crate::memory::LinearMemory::stack_enter`].
///
/// Must be handed back to [`crate::memory::LinearMemory::stack_exit`] in LIFO order.
#[must_use = "a stack frame must be closed with stack_exit"]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackFrame {
    /// A live frame
    Active {
        /// Stack top when the frame was opened
        saved_top: usize,
        /// Nesting depth of this frame, 1 for the outermost
        depth: usize,
    },
    /// A zero-sized frame that was skipped; closing it does nothing
    Elided,
}

impl StackFrame {
    /// Returns `true` for a skipped frame.
    #[must_use]
    pub fn is_elided(&self) -> bool {
        matches!(self, StackFrame::Elided)
    }

    /// Stack top captured on entry, `None` for elided frames.
    #[must_use]
    pub fn saved_top(&self) -> Option<usize> {
        match self {
            StackFrame::Active { saved_top, .. } => Some(*saved_top),
            StackFrame::Elided => None,
        }
    }

    /// Nesting depth, `None` for elided frames.
    #[must_use]
    pub fn depth(&self) -> Option<usize> {
        match self {
            StackFrame::Active { depth, .. } => Some(*depth),
            StackFrame::Elided => None,
        }
    }
}
