//! Logging setup shared by the Crosscast binaries.
//!
//! All diagnostics go through `tracing`; a binary installs one
//! subscriber at startup. `CROSSCAST_LOG_FORMAT` and `CROSSCAST_LOG`
//! pick the defaults, and `RUST_LOG` wins over both for filtering.

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Plain text on stderr, suitable for piping.
    Text,
    /// One JSON object per line.
    Json,
    /// Colored multi-line output for development.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{}' (text, json, pretty)", other)),
        }
    }
}

/// How a binary wants its diagnostics rendered and filtered.
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Default filter directive, overridden by `RUST_LOG` when set.
    pub filter: String,
}

impl LoggingConfig {
    pub fn new(format: LogFormat, filter: impl Into<String>) -> Self {
        Self {
            format,
            filter: filter.into(),
        }
    }

    /// Read format and filter from `CROSSCAST_LOG_FORMAT` /
    /// `CROSSCAST_LOG`, defaulting to text at info level.
    pub fn from_env() -> Self {
        let format = std::env::var("CROSSCAST_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(LogFormat::Text);
        let filter = std::env::var("CROSSCAST_LOG").unwrap_or_else(|_| "info".to_string());
        Self::new(format, filter)
    }

    /// Install the global subscriber. Call once at startup.
    ///
    /// # Panics
    ///
    /// Panics if a subscriber is already installed.
    pub fn init(self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.filter));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);

        match self.format {
            LogFormat::Json => builder
                .json()
                .with_current_span(true)
                .flatten_event(true)
                .init(),
            LogFormat::Pretty => builder.pretty().with_line_number(true).init(),
            LogFormat::Text => builder.with_target(false).init(),
        }
    }
}

/// Text logging with env-var overrides; what the binaries call unless a
/// flag says otherwise.
pub fn init_default() {
    LoggingConfig::from_env().init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing_is_case_insensitive() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let error = "syslog".parse::<LogFormat>().unwrap_err();
        assert!(error.contains("syslog"));
    }

    #[test]
    fn test_config_holds_filter() {
        let config = LoggingConfig::new(LogFormat::Json, "libcrosscast=debug");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter, "libcrosscast=debug");
    }
}
