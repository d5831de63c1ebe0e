//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `REPORT_RELAY` prefix and nested values use double underscores as separators.
//!
//! The conventional flat variables of a broker/document-store deployment
//! (`RABBITMQ_HOST`, `MONGO_URI`, ...) are honoured as overrides.
//!
//! # Example
//!
//! ```no_run
//! use report_relay::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Publishing to {}", config.publisher.exchange);
//! ```

mod broker;
mod database;
mod error;
mod pagination;
mod publisher;

pub use broker::BrokerConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use pagination::PaginationConfig;
pub use publisher::PublisherConfig;

use std::collections::HashMap;

use serde::Deserialize;

use crate::telemetry::LogFormat;

const ENV_PREFIX: &str = "REPORT_RELAY";
const ENV_NAME: &str = "ENV_NAME";

/// Flat variable -> configuration key.
const FLAT_OVERRIDES: [(&str, &str); 9] = [
    (ENV_NAME, "environment"),
    ("MAX_PAGINATION_LIMIT", "pagination.max_limit"),
    ("RABBITMQ_HOST", "broker.host"),
    ("RABBITMQ_PORT", "broker.port"),
    ("RABBITMQ_DEFAULT_USER", "broker.username"),
    ("RABBITMQ_DEFAULT_PASS", "broker.password"),
    ("RABBITMQ_VHOST", "broker.vhost"),
    ("MONGO_URI", "database.uri"),
    ("MONGO_NAME", "database.name"),
];

/// Deployment environment
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    #[serde(alias = "dev")]
    Development,
    Staging,
    #[serde(alias = "prod")]
    Production,
}

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,

    /// Log filter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// AMQP broker connection
    pub broker: BrokerConfig,

    /// Document store connection
    pub database: DatabaseConfig,

    /// Exchange, routing key, tenancy and retry policy
    #[serde(default)]
    pub publisher: PublisherConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,
}

/// Returns true when `.env` should be read for the given `ENV_NAME`.
pub fn loads_dotenv(env_name: Option<&str>) -> bool {
    match env_name.map(str::trim) {
        None | Some("") => true,
        Some(name) => name.eq_ignore_ascii_case("local"),
    }
}

impl AppConfig {
    /// Load configuration from the process environment
    ///
    /// `.env` is read first, but only for local runs (`ENV_NAME` unset or
    /// `local`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required values are missing or cannot be
    /// parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        if loads_dotenv(std::env::var(ENV_NAME).ok().as_deref()) {
            dotenvy::dotenv().ok();
        }
        Self::load_from(std::env::vars().collect())
    }

    /// Load configuration from an explicit variable set
    ///
    /// # Environment Variable Format
    ///
    /// - `REPORT_RELAY__BROKER__PORT=5673` -> `broker.port = 5673`
    /// - `RABBITMQ_PORT=5673` -> `broker.port = 5673` (wins over the prefixed form)
    pub fn load_from(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder().add_source(
            config::Environment::default()
                .prefix(ENV_PREFIX)
                .separator("__")
                .source(Some(vars.clone())),
        );

        for (var, key) in FLAT_OVERRIDES {
            let value = vars
                .get(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty());
            builder = builder.set_override_option(key, value)?;
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found, section by section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.broker.validate()?;
        self.database.validate()?;
        self.publisher.validate()?;
        self.pagination.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn default_log_level() -> String {
    "info,report_relay=debug".to_string()
}
