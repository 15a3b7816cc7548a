use log::debug;

/// The filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Logging configuration passed to [`init_logging`]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogConfig {
    /// An `env_logger` filter directive such as `info` or `credx_harness=debug`
    pub filter: String,
    /// Include timestamps in log lines
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Read the filter from `RUST_LOG`, falling back to `info`
    pub fn from_env() -> Self {
        match std::env::var("RUST_LOG") {
            Ok(filter) if !filter.trim().is_empty() => Self {
                filter,
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    /// Replace the filter
    pub fn with_filter<S: Into<String>>(self, filter: S) -> Self {
        Self {
            filter: filter.into(),
            ..self
        }
    }
}

/// Install the process logger.
///
/// Calling this more than once keeps the first logger.
pub fn init_logging(config: &LogConfig) {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&config.filter);
    if !config.timestamps {
        builder.format_timestamp(None);
    }
    if builder.try_init().is_err() {
        debug!("logger already initialised, keeping it");
    }
}
