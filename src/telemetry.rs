//! Tracing subscriber setup.

use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, for local runs.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    InvalidFilter(#[from] ParseError),

    #[error("tracing subscriber already installed")]
    AlreadyInitialized(#[from] TryInitError),
}

fn build_filter(log_level: &str) -> Result<EnvFilter, ParseError> {
    EnvFilter::try_new(log_level)
}

/// Installs the global subscriber.
///
/// `RUST_LOG`, when set and valid, overrides `log_level`.
pub fn init_tracing(log_level: &str, format: LogFormat) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(log_level)?,
    };
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(false))
            .try_init()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_directive_lists() {
        assert!(build_filter("info,report_relay=debug,lapin=warn").is_ok());
    }

    #[test]
    fn rejects_unknown_levels() {
        assert!(build_filter("report_relay=loud").is_err());
    }

    #[test]
    fn log_format_deserializes_lowercase() {
        let format: LogFormat = serde_json::from_str("\"json\"").unwrap();
        assert_eq!(format, LogFormat::Json);
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }

    #[test]
    fn second_init_is_reported() {
        let _ = init_tracing("warn", LogFormat::Json);
        let second = init_tracing("warn", LogFormat::Pretty);
        assert!(matches!(second, Err(TelemetryError::AlreadyInitialized(_))));
    }
}
