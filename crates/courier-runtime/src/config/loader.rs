//! Configuration loader using figment.
//!
//! Sources are layered, later ones overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. Profile-specific config file (`courier.{profile}.toml` / `courier.{profile}.yaml`)
//! 3. Main config file (`courier.toml` / `courier.yaml`)
//! 4. Environment variables (`COURIER_*`)
//! 5. Programmatic overrides
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables TOML configuration files
//! - `yaml-config`: enables YAML configuration files
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `COURIER_` prefix with `__` as separator:
//!
//! - `COURIER_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `COURIER_POLLING__TIMEOUT_SECS=60` → `polling.timeout_secs = 60`
//!
//! ```rust,ignore
//! use courier_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/courier.toml")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::CourierConfig;
use super::validation::validate_config;

const ENV_PREFIX: &str = "COURIER_";
const PROFILE_VAR: &str = "COURIER_PROFILE";
const APP_DIR: &str = "courier";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name, accepting the short forms `dev` and `prod`.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            _ => Self::Custom(name.to_string()),
        }
    }

    /// Reads the profile from `COURIER_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_VAR)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Programmatic overrides.
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Profile::parse(&profile.into());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Adds the user config directory (e.g. `~/.config/courier`) to search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.search_path(config_dir.join(APP_DIR))
        } else {
            self
        }
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges additional configuration programmatically.
    ///
    /// Merged values override every other source.
    pub fn merge(mut self, config: CourierConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads, validates and returns the configuration.
    pub fn load(self) -> ConfigResult<CourierConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: CourierConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            bots = config.bots.len(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(CourierConfig::default()));

        if let Some(path) = self.config_file.take() {
            if path.exists() {
                info!(path = %path.display(), "Loading configuration file");
                figment = Self::merge_config_file(figment, &path)?;
            } else {
                return Err(ConfigError::FileNotFound(path));
            }
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(&["PROFILE"])
                    .split("__"),
            );
        }

        let overrides = std::mem::take(&mut self.figment);
        Ok(figment.merge(overrides))
    }

    /// Merges a single config file into the figment, dispatching on file extension.
    ///
    /// Only extensions enabled via feature flags are accepted.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join(APP_DIR));
            }
            paths
        } else {
            self.search_paths.clone()
        }
    }

    /// Searches `search_paths × base_names`, merging a profile-specific
    /// variant before its base file. Stops at the first base file found.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let Some((stem, ext)) = base_name.rsplit_once('.') else {
                    continue;
                };

                let profile_path = search_path.join(format!("{stem}.{}.{ext}", self.profile));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = merge_fn(figment, &profile_path);
                }

                let base_path = search_path.join(base_name);
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    figment = merge_fn(figment, &base_path);
                    return (figment, true);
                }
            }
        }
        (figment, false)
    }

    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        #[allow(unused_mut)]
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["courier.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["courier.yaml", "courier.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!("No configuration file found, using defaults");
        }
        figment
    }
}

/// Loads the configuration from the default locations.
pub fn load_config() -> ConfigResult<CourierConfig> {
    ConfigLoader::new().load()
}

/// Loads the configuration from `path`, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<CourierConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .unwrap();

            assert_eq!(config.logging.level.as_str(), "info");
            assert!(config.bots.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("prod"), Profile::Production);
        assert_eq!(Profile::parse("Development"), Profile::Development);
        assert_eq!(Profile::parse("staging"), Profile::Custom("staging".into()));
    }

    #[test]
    fn test_profile_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("COURIER_PROFILE", "production");
            assert_eq!(Profile::from_env(), Profile::Production);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_is_an_error() {
        Jail::expect_with(|jail| {
            let result = ConfigLoader::new()
                .file(jail.directory().join("absent.toml"))
                .load();
            assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_layering_file_profile_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "courier.toml",
                r#"
                [logging]
                level = "warn"

                [polling]
                timeout_secs = 10

                [[bots]]
                name = ""
                token = "1:file"
                "#,
            )?;
            jail.create_file(
                "courier.production.toml",
                r#"
                [polling]
                timeout_secs = 50
                limit = 20
                "#,
            )?;
            jail.set_env("COURIER_LOGGING__LEVEL", "debug");

            let config = ConfigLoader::new()
                .profile("production")
                .search_path(jail.directory())
                .load()
                .unwrap();

            // The main file wins over the profile file, env wins over both.
            assert_eq!(config.polling.timeout_secs, 10);
            assert_eq!(config.polling.limit, 20);
            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.credentials("").unwrap().token, "1:file");
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_invalid_file_fails_validation() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "courier.toml",
                r#"
                [polling]
                limit = 500
                "#,
            )?;

            let result = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load();
            assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
            Ok(())
        });
    }

    #[test]
    fn test_merge_overrides_defaults() {
        Jail::expect_with(|jail| {
            let mut overrides = CourierConfig::default();
            overrides.logging.level = LogLevel::Trace;

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .merge(overrides)
                .load()
                .unwrap();
            assert_eq!(config.logging.level, LogLevel::Trace);
            Ok(())
        });
    }
}
