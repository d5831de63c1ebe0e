//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(&'static str),

    #[error("Invalid document store URI format")]
    InvalidDatabaseUri,

    #[error("Pool size must be between 1 and {0}")]
    InvalidPoolSize(u32),

    #[error("Initial backoff must be positive and not exceed max backoff")]
    InvalidBackoff,

    #[error("Backoff factor must be at least 1.0")]
    InvalidBackoffFactor,

    #[error("Pagination max limit must be positive")]
    InvalidPaginationLimit,
}
