//! Error types for the Courier framework.
//!
//! Three families exist, matching the phases of a bot's life:
//!
//! - [`ConfigError`] and [`MappingError`] are raised while binding
//!   controllers at startup. They are fatal: a bot never starts with an
//!   invalid binding.
//! - [`DispatchError`] describes why a single update cycle did not complete
//!   normally. It is handed to the completion hook and logged, never
//!   propagated to the transport loop.
//! - [`ArgumentError`] is returned by typed accessors on
//!   [`Arguments`](crate::param::Arguments) inside handler code.
//!
//! Wrapping variants do not repeat their source in `Display`; format them
//! through [`ErrorChain`] to see every cause.

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use courier_core::TransportError;

use crate::param::RouteKind;

pub use tower::BoxError;

/// Reasons a parameter descriptor cannot be mapped to an argument source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// The matched-text marker was put on a non-string parameter.
    #[error("text extraction is only supported on string parameters, found {ty}")]
    TextOnNonString {
        /// Declared parameter type.
        ty: String,
    },

    /// A capture group marker was put on a non-string parameter.
    #[error("group extraction is only supported on string parameters, found {ty}")]
    GroupOnNonString {
        /// Declared parameter type.
        ty: String,
    },

    /// A capture group marker with an empty name and a negative index.
    #[error("invalid group: name must be non-empty or index >= 0")]
    InvalidGroup,

    /// A non-optional raw object that the route cannot guarantee.
    #[error("no raw {object} available on {route} handlers")]
    RawUnavailable {
        /// The requested object ("message" or "callback").
        object: &'static str,
        /// The route the handler is registered for.
        route: RouteKind,
    },

    /// A raw marker on a type that is not a platform object.
    #[error("raw extraction is not supported for {ty}")]
    RawUnsupported {
        /// Declared parameter type.
        ty: String,
    },

    /// An unannotated string parameter without a name.
    #[error("string parameters without a group marker must be named")]
    UnnamedString,

    /// No rule applies to the parameter.
    #[error("could not determine parameter mapping for {ty}")]
    Undetermined {
        /// Declared parameter type.
        ty: String,
    },
}

/// Startup-fatal configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A route pattern does not compile.
    #[error("invalid pattern '{pattern}' on {handler}: {source}")]
    InvalidPattern {
        /// The handler declaring the pattern.
        handler: String,
        /// The offending pattern.
        pattern: String,
        /// The regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// A parameter could not be mapped.
    #[error("parameter #{index} ({param}) of {handler}: {source}")]
    UnmappableParameter {
        /// The handler declaring the parameter.
        handler: String,
        /// Position of the parameter.
        index: usize,
        /// Descriptive form of the parameter.
        param: String,
        /// Why the parameter cannot be mapped.
        #[source]
        source: MappingError,
    },

    /// More than one fallback handler for one bot.
    #[error(
        "multiple fallback handlers found for bot '{bot}' ({first}, {second}); each bot may only have one fallback handler"
    )]
    DuplicateFallback {
        /// The bot name.
        bot: String,
        /// The first fallback found.
        first: String,
        /// The conflicting fallback.
        second: String,
    },

    /// A fallback function whose return type carries a value.
    #[error("fallback handler {handler} must not return a value")]
    FallbackReturnsValue {
        /// The offending handler.
        handler: String,
    },

    /// Controllers reference a bot for which no credentials exist.
    #[error("no credentials configured for bot '{bot}'")]
    MissingCredentials {
        /// The bot name.
        bot: String,
    },
}

/// Why an update cycle did not complete normally.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The handler function returned an error.
    #[error("handler failed")]
    Handler(#[source] BoxError),

    /// The handler function panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// A filter hook returned `false`.
    #[error("update rejected by {hook}")]
    Rejected {
        /// Name of the rejecting hook.
        hook: &'static str,
    },

    /// A hook returned an error.
    #[error("{hook} failed")]
    Hook {
        /// Name of the failing hook.
        hook: &'static str,
        /// The hook's error.
        #[source]
        source: BoxError,
    },

    /// Sending the reply or stripping the keyboard failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A reply was produced but the update has no conversation to send it to.
    #[error("update {0} has no conversation to reply to")]
    NoConversation(i64),

    /// Resolving the principal or preparing the context failed.
    #[error("failed to prepare update context")]
    Preparation(#[source] BoxError),
}

impl DispatchError {
    /// Returns `true` if this error is a hook rejection rather than a fault.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Hook { .. })
    }

    /// Formats this error followed by all of its causes.
    pub fn chain(&self) -> ErrorChain<'_> {
        ErrorChain(self)
    }
}

/// Displays an error and its `source()` chain, separated by `": "`.
pub struct ErrorChain<'a>(pub &'a (dyn StdError + 'static));

impl fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut cause = self.0.source();
        while let Some(err) = cause {
            write!(f, ": {err}")?;
            cause = err.source();
        }
        Ok(())
    }
}

/// Errors returned by typed argument accessors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// No argument at the requested position.
    #[error("no argument at position {0}")]
    OutOfRange(usize),

    /// No parameter with the requested name.
    #[error("no parameter named '{0}'")]
    UnknownName(String),

    /// The argument has a different kind than requested.
    #[error("argument {index} is a {actual}, expected a {expected}")]
    TypeMismatch {
        /// Position of the argument.
        index: usize,
        /// Requested kind.
        expected: &'static str,
        /// Actual kind.
        actual: &'static str,
    },

    /// The argument is absent but was requested as required.
    #[error("argument {0} is absent")]
    Missing(usize),
}

/// Result type for binding operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
