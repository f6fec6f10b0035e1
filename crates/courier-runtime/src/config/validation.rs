//! Configuration validation utilities.

use std::collections::HashSet;

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, CourierConfig, LogOutput, LoggingConfig, PollingConfig};

/// Accepted range of `polling.limit`, as enforced by the Bot API.
const POLLING_LIMIT: std::ops::RangeInclusive<u32> = 1..=100;

/// Validates the entire configuration.
pub fn validate_config(config: &CourierConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_polling_config(&config.polling)?;
    validate_bots_config(&config.bots)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    for module in logging.filters.keys() {
        if module.is_empty() || module.contains(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid log filter target: '{module}'"
            )));
        }
    }

    Ok(())
}

fn validate_polling_config(polling: &PollingConfig) -> ConfigResult<()> {
    if !POLLING_LIMIT.contains(&polling.limit) {
        return Err(ConfigError::validation(format!(
            "Polling limit must be between {} and {}, got {}",
            POLLING_LIMIT.start(),
            POLLING_LIMIT.end(),
            polling.limit
        )));
    }

    if polling.retry_delay_ms == 0 {
        return Err(ConfigError::validation(
            "Polling retry delay must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_bots_config(bots: &[BotConfig]) -> ConfigResult<()> {
    let mut seen_names = HashSet::new();

    for bot in bots {
        if !seen_names.insert(&bot.name) {
            return Err(ConfigError::DuplicateBotName(bot.name.clone()));
        }

        validate_bot_config(bot)?;
    }

    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    // The empty name is the default bot.
    if bot.name.contains(char::is_whitespace) {
        return Err(ConfigError::validation(format!(
            "Bot name cannot contain whitespace: '{}'",
            bot.name
        )));
    }

    if bot.token.trim().is_empty() {
        return Err(ConfigError::missing_field(format!(
            "bots.{}.token",
            bot.display_name()
        )));
    }

    validate_url(&bot.api_url)?;

    Ok(())
}

fn validate_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("api_url"));
    }

    let valid_schemes = ["http://", "https://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::validation(format!(
            "Invalid URL: {url} - URL must start with one of: {valid_schemes:?}"
        )));
    }

    Ok(())
}
