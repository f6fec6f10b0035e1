//! Logging setup for Courier applications.
//!
//! Built on `tracing-subscriber`: an [`EnvFilter`] (where `RUST_LOG` wins over
//! the configured level) feeding one `fmt` layer that writes to stdout,
//! stderr or a file.
//!
//! ```rust,ignore
//! use courier_runtime::{config::load_config, logging};
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! The dispatch span of every update carries the `bot`, `update_id`, `kind`
//! and `cycle` fields, so enabling [`SpanEvents::LIFECYCLE`] shows one line
//! per dispatch cycle when it opens and closes.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LogOutput, LogRotation, LoggingConfig, SpanEventConfig};

const DEFAULT_LOG_FILE: &str = "courier.log";

/// Span lifecycle events to log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanEvents {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

impl SpanEvents {
    /// No span events.
    pub const NONE: Self = Self {
        new: false,
        enter: false,
        exit: false,
        close: false,
    };

    /// Span creation and close: one line when a dispatch cycle starts and
    /// one with its timing when it ends.
    pub const LIFECYCLE: Self = Self {
        new: true,
        enter: false,
        exit: false,
        close: true,
    };

    /// Every span event.
    pub const FULL: Self = Self {
        new: true,
        enter: true,
        exit: true,
        close: true,
    };

    fn to_fmt_span(self) -> FmtSpan {
        let mut span = FmtSpan::NONE;
        if self.new {
            span |= FmtSpan::NEW;
        }
        if self.enter {
            span |= FmtSpan::ENTER;
        }
        if self.exit {
            span |= FmtSpan::EXIT;
        }
        if self.close {
            span |= FmtSpan::CLOSE;
        }
        span
    }
}

impl From<&SpanEventConfig> for SpanEvents {
    fn from(config: &SpanEventConfig) -> Self {
        Self {
            new: config.new,
            enter: config.enter,
            exit: config.exit,
            close: config.close,
        }
    }
}

/// Initializes logging from a [`LoggingConfig`].
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// A builder for the global tracing subscriber.
///
/// ```rust,ignore
/// LoggingBuilder::new()
///     .with_level(Level::DEBUG)
///     .directive("courier_transport=trace")
///     .span_events(SpanEvents::LIFECYCLE)
///     .init();
/// ```
#[derive(Debug)]
pub struct LoggingBuilder {
    directives: Vec<String>,
    level: tracing::Level,
    span_events: SpanEvents,
    format: LogFormat,
    output: LogOutput,
    with_target: bool,
    with_thread_ids: bool,
    with_file: bool,
    with_line_number: bool,
    file_path: Option<PathBuf>,
    rotation: LogRotation,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    /// Creates a builder logging at `info` to stdout in compact format.
    pub fn new() -> Self {
        Self {
            directives: Vec::new(),
            level: tracing::Level::INFO,
            span_events: SpanEvents::NONE,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            with_target: true,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
            file_path: None,
            rotation: LogRotation::Never,
        }
    }

    /// Creates a builder from a [`LoggingConfig`].
    pub fn from_config(config: &LoggingConfig) -> Self {
        let directives = config
            .filters
            .iter()
            .map(|(module, level)| format!("{module}={level}"))
            .collect();

        Self {
            directives,
            level: config.level.to_tracing_level(),
            span_events: SpanEvents::from(&config.span_events),
            format: config.format,
            output: config.output,
            with_target: true,
            with_thread_ids: config.thread_ids,
            with_file: config.file_location,
            with_line_number: config.file_location,
            file_path: config.file_path.clone(),
            rotation: config.rotation,
        }
    }

    /// Sets the base log level.
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    /// Adds a filter directive such as `courier_framework=debug`.
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    /// Sets which span events are logged.
    pub fn span_events(mut self, events: SpanEvents) -> Self {
        self.span_events = events;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.with_thread_ids = enabled;
        self
    }

    /// Includes source file and line number.
    pub fn with_file_location(mut self, enabled: bool) -> Self {
        self.with_file = enabled;
        self.with_line_number = enabled;
        self
    }

    /// Sets the log file for [`LogOutput::File`].
    pub fn file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn rotation(mut self, rotation: LogRotation) -> Self {
        self.rotation = rotation;
        self
    }

    fn build_filter(&self) -> EnvFilter {
        let base_filter = self.level.to_string().to_lowercase();
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&base_filter));

        for directive in &self.directives {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(_) => eprintln!("Ignoring invalid log directive: {directive}"),
            }
        }

        filter
    }

    fn file_appender(&self, path: &Path) -> Result<RollingFileAppender, InitError> {
        let rotation = match self.rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
        };
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE));

        RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(file_name.to_string_lossy())
            .build(dir)
    }

    /// Installs the subscriber, ignoring an already installed one.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let filter = self.build_filter();
        let span_events = self.span_events.to_fmt_span();

        macro_rules! configure_layer {
            ($layer:expr) => {
                $layer
                    .with_span_events(span_events.clone())
                    .with_target(self.with_target)
                    .with_thread_ids(self.with_thread_ids)
                    .with_file(self.with_file)
                    .with_line_number(self.with_line_number)
            };
        }

        macro_rules! init_with_writer {
            ($writer:expr) => {
                match self.format {
                    #[cfg(feature = "json-log")]
                    LogFormat::Json => tracing_subscriber::registry()
                        .with(
                            fmt::layer()
                                .json()
                                .with_span_events(span_events.clone())
                                .with_writer($writer),
                        )
                        .with(filter)
                        .try_init(),
                    LogFormat::Compact => tracing_subscriber::registry()
                        .with(configure_layer!(fmt::layer().compact().with_writer($writer)))
                        .with(filter)
                        .try_init(),
                    LogFormat::Full => tracing_subscriber::registry()
                        .with(configure_layer!(fmt::layer().with_writer($writer)))
                        .with(filter)
                        .try_init(),
                    LogFormat::Pretty => tracing_subscriber::registry()
                        .with(configure_layer!(fmt::layer().pretty().with_writer($writer)))
                        .with(filter)
                        .try_init(),
                }
            };
        }

        match self.output {
            LogOutput::Stdout => init_with_writer!(std::io::stdout),
            LogOutput::Stderr => init_with_writer!(std::io::stderr),
            LogOutput::File => match self.file_path.as_deref().map(|p| self.file_appender(p)) {
                Some(Ok(appender)) => init_with_writer!(appender),
                Some(Err(err)) => {
                    eprintln!("Failed to open log file ({err}), falling back to stdout");
                    init_with_writer!(std::io::stdout)
                }
                None => {
                    eprintln!("File output requested but no file path configured, falling back to stdout");
                    init_with_writer!(std::io::stdout)
                }
            },
        }
    }
}
