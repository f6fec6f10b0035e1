//! Configuration module for the Courier runtime.
//!
//! This module provides layered configuration loading and validation for
//! bot identities, long-polling and logging.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, CourierConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, PollingConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
