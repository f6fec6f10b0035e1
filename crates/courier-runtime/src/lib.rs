//! # Courier Runtime
//!
//! Orchestration layer for the Courier bot framework.
//!
//! This crate provides:
//! - Layered configuration loading (`config`)
//! - Logging setup on `tracing-subscriber` (`logging`)
//! - The per-bot polling loop ([`BotRunner`])
//! - Multi-bot orchestration ([`CourierRuntime`]) with a registry of the
//!   running bots' senders ([`SenderRegistry`])
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output
//! - `http-client`: the Bot API transport, used by default when enabled
//!
//! ```rust,ignore
//! use courier_runtime::CourierRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = CourierRuntime::new();
//!     runtime.register_controller(greeting_controller()).await;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod runner;
pub mod runtime;

#[cfg(test)]
mod test_util;

pub use config::{BotConfig, ConfigError, ConfigLoader, ConfigResult, CourierConfig, PollingConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use registry::SenderRegistry;
pub use runner::{BotRunner, RunnerStats};
#[cfg(feature = "http-client")]
pub use runtime::TelegramTransportFactory;
pub use runtime::{CourierRuntime, RuntimeBuilder, RuntimeStats, Transport, TransportFactory};

// Re-export tracing for use by applications
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for applications.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
