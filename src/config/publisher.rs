//! Report publisher configuration

use std::time::Duration;

use serde::Deserialize;

use crate::adapters::broker::RetryPolicy;
use crate::application::PublishTarget;

use super::error::ValidationError;

/// Where and how report requests are published
#[derive(Debug, Clone, Deserialize)]
pub struct PublisherConfig {
    #[serde(default = "default_exchange")]
    pub exchange: String,

    #[serde(default = "default_routing_key")]
    pub routing_key: String,

    /// Route each tenant to its own virtual host
    #[serde(default)]
    pub multi_tenant: bool,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl PublisherConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            factor: self.backoff_factor,
            max_retries: self.max_retries,
        }
    }

    pub fn target(&self) -> PublishTarget {
        PublishTarget::new(&self.exchange, &self.routing_key)
    }

    /// Validate publisher configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.exchange.trim().is_empty() {
            return Err(ValidationError::MissingRequired("publisher.exchange"));
        }
        if self.routing_key.trim().is_empty() {
            return Err(ValidationError::MissingRequired("publisher.routing_key"));
        }
        if self.initial_backoff_ms == 0 || self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ValidationError::InvalidBackoff);
        }
        if self.backoff_factor.is_nan() || self.backoff_factor < 1.0 {
            return Err(ValidationError::InvalidBackoffFactor);
        }
        Ok(())
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            exchange: default_exchange(),
            routing_key: default_routing_key(),
            multi_tenant: false,
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            backoff_factor: default_backoff_factor(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_exchange() -> String {
    "report.generate".to_string()
}

fn default_routing_key() -> String {
    "report.generate.key".to_string()
}

fn default_initial_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    10_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_retries() -> u32 {
    5
}
