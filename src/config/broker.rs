//! Message broker configuration

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::adapters::broker::{BrokerRouter, LapinConnector};
use crate::ports::BrokerConnector;

use super::error::ValidationError;

/// AMQP broker configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: String,

    pub password: SecretString,

    /// Virtual host used by the single-tenant router
    #[serde(default = "default_vhost")]
    pub vhost: String,

    /// Prepended to the tenant id to form per-tenant virtual hosts
    #[serde(default)]
    pub tenant_vhost_prefix: String,

    /// TCP dial plus AMQP handshake timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl BrokerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// AMQP connector for this broker.
    pub fn connector(&self) -> LapinConnector {
        LapinConnector::new(
            &self.host,
            self.port,
            &self.username,
            self.password.clone(),
            self.connect_timeout(),
        )
    }

    /// Router of the requested shape over `connector`.
    pub fn router(&self, connector: Arc<dyn BrokerConnector>, multi_tenant: bool) -> BrokerRouter {
        if multi_tenant {
            BrokerRouter::multi(connector, &self.tenant_vhost_prefix)
        } else {
            BrokerRouter::single(connector, &self.vhost)
        }
    }

    /// Validate broker configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.trim().is_empty() {
            return Err(ValidationError::MissingRequired("RABBITMQ_HOST"));
        }
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if self.username.trim().is_empty() {
            return Err(ValidationError::MissingRequired("RABBITMQ_DEFAULT_USER"));
        }
        if self.vhost.is_empty() {
            return Err(ValidationError::MissingRequired("RABBITMQ_VHOST"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("broker connect"));
        }
        Ok(())
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5672
}

fn default_vhost() -> String {
    "/".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}
