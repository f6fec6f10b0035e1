//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while starting the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Controllers could not be bound to their bots.
    #[error("Failed to bind controllers: {0}")]
    Binding(#[from] courier_framework::ConfigError),

    /// A transport could not be created.
    #[error("Transport error: {0}")]
    Transport(#[from] courier_core::TransportError),

    /// No transport factory is available for a bot.
    #[error("No transport available for bot '{bot}'")]
    NoTransport { bot: String },

    /// The runtime was started twice.
    #[error("Runtime is already running")]
    AlreadyRunning,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
