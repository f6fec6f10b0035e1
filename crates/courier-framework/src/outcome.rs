//! Processing outcomes of one dispatch cycle.

use std::fmt;

/// The result of dispatching one update.
///
/// Produced fresh for every update and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProcessingOutcome {
    /// Stopped by the `on_update` hook.
    Skipped,
    /// The cycle failed outside of handler code.
    Failed,
    /// Handlers matched but none was authorized.
    HandlerUnauthorized,
    /// Stopped by the `on_authorized_access` hook before a handler ran.
    HandlerSkipped,
    /// The selected handler (or the fallback) returned an error.
    HandlerFailed,
    /// The selected handler (or the fallback) completed.
    HandlerCompleted,
    /// Nothing matched and the fallback handler is not authorized.
    FallbackUnauthorized,
    /// Stopped by the `on_authorized_access` hook before the fallback ran.
    FallbackSkipped,
    /// Nothing matched and no fallback handler exists.
    NoHandler,
}

impl ProcessingOutcome {
    /// All outcomes, in declaration order.
    pub const ALL: [ProcessingOutcome; 9] = [
        Self::Skipped,
        Self::Failed,
        Self::HandlerUnauthorized,
        Self::HandlerSkipped,
        Self::HandlerFailed,
        Self::HandlerCompleted,
        Self::FallbackUnauthorized,
        Self::FallbackSkipped,
        Self::NoHandler,
    ];

    /// Stable upper-case name, as used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skipped => "SKIPPED",
            Self::Failed => "FAILED",
            Self::HandlerUnauthorized => "HANDLER_UNAUTHORIZED",
            Self::HandlerSkipped => "HANDLER_SKIPPED",
            Self::HandlerFailed => "HANDLER_FAILED",
            Self::HandlerCompleted => "HANDLER_COMPLETED",
            Self::FallbackUnauthorized => "FALLBACK_UNAUTHORIZED",
            Self::FallbackSkipped => "FALLBACK_SKIPPED",
            Self::NoHandler => "NO_HANDLER",
        }
    }

    /// Returns `true` if a handler ran to completion.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::HandlerCompleted)
    }

    /// Returns `true` for outcomes that indicate a fault.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::HandlerFailed)
    }
}

impl fmt::Display for ProcessingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
