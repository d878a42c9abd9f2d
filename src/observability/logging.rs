//! Logging configuration.

use crate::config::LoggingSettings;
use crate::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Environment variable holding filter directives.
pub const ENV_LOG: &str = "EMBEDSTORE_LOG";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-oriented output.
    Pretty,
    /// Single-line output.
    #[default]
    Compact,
    /// Newline-delimited JSON.
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(Error::Configuration(format!(
                "unknown log format '{other}' (expected pretty, compact or json)"
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

/// Logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Filter directives.
    pub filter: EnvFilter,
    /// Output format.
    pub format: LogFormat,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds a configuration from file settings and the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an invalid format or filter.
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Result<Self> {
        Self::from_sources(settings, verbose, |name| std::env::var(name).ok())
    }

    /// Builds a configuration, reading variables through `lookup`.
    ///
    /// Directives come from `EMBEDSTORE_LOG`, then `RUST_LOG`, then the
    /// settings, and default to `info` (`debug` when `verbose`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an invalid format or filter.
    pub fn from_sources(
        settings: &LoggingSettings,
        verbose: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let directives = resolve_directives(settings, verbose, lookup);
        let filter = EnvFilter::try_new(&directives).map_err(|e| {
            Error::Configuration(format!("invalid log filter '{directives}': {e}"))
        })?;
        let format = settings
            .format
            .as_deref()
            .map_or(Ok(LogFormat::default()), LogFormat::from_str)?;
        Ok(Self {
            filter,
            format,
            file: settings.file.clone(),
        })
    }
}

/// Picks the filter directives to use.
pub fn resolve_directives(
    settings: &LoggingSettings,
    verbose: bool,
    lookup: impl Fn(&str) -> Option<String>,
) -> String {
    [ENV_LOG, "RUST_LOG"]
        .into_iter()
        .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
        .or_else(|| settings.level.clone())
        .unwrap_or_else(|| if verbose { "debug" } else { "info" }.to_string())
}
