//! Document store configuration

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::adapters::mongo::{MongoConnection, MongoReportRepository};

use super::error::ValidationError;

/// Upper bound on the driver connection pool.
const MAX_POOL_SIZE: u32 = 500;

/// Document store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string (`mongodb://` or `mongodb+srv://`)
    pub uri: SecretString,

    /// Shared database used when a request carries no tenant database
    pub name: String,

    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Bound on `ensure_indexes`, in seconds
    #[serde(default = "default_index_provision_timeout")]
    pub index_provision_timeout_secs: u64,

    /// Bound on `drop_indexes`, in seconds
    #[serde(default = "default_index_drop_timeout")]
    pub index_drop_timeout_secs: u64,

    #[serde(default = "default_collection")]
    pub collection: String,
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn index_provision_timeout(&self) -> Duration {
        Duration::from_secs(self.index_provision_timeout_secs)
    }

    pub fn index_drop_timeout(&self) -> Duration {
        Duration::from_secs(self.index_drop_timeout_secs)
    }

    /// Opens the shared client.
    pub async fn connect(&self) -> Result<MongoConnection, mongodb::error::Error> {
        MongoConnection::connect(
            &self.uri,
            &self.name,
            self.max_pool_size,
            self.connect_timeout(),
        )
        .await
    }

    /// Repository over `connection` with this section's collection and timeouts.
    pub fn repository(&self, connection: MongoConnection) -> MongoReportRepository {
        MongoReportRepository::new(connection)
            .with_collection(&self.collection)
            .with_index_timeouts(self.index_provision_timeout(), self.index_drop_timeout())
    }

    /// Validate database configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let uri = self.uri.expose_secret();
        if uri.is_empty() {
            return Err(ValidationError::MissingRequired("MONGO_URI"));
        }
        if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
            return Err(ValidationError::InvalidDatabaseUri);
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingRequired("MONGO_NAME"));
        }
        if self.collection.trim().is_empty() {
            return Err(ValidationError::MissingRequired("database.collection"));
        }
        if self.max_pool_size == 0 || self.max_pool_size > MAX_POOL_SIZE {
            return Err(ValidationError::InvalidPoolSize(MAX_POOL_SIZE));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("database connect"));
        }
        if self.index_provision_timeout_secs == 0 || self.index_drop_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("index maintenance"));
        }
        Ok(())
    }
}

fn default_max_pool_size() -> u32 {
    100
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_index_provision_timeout() -> u64 {
    60
}

fn default_index_drop_timeout() -> u64 {
    30
}

fn default_collection() -> String {
    "report".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(uri: &str) -> DatabaseConfig {
        DatabaseConfig {
            uri: SecretString::new(uri.to_string()),
            name: "reports".to_string(),
            max_pool_size: default_max_pool_size(),
            connect_timeout_secs: default_connect_timeout(),
            index_provision_timeout_secs: default_index_provision_timeout(),
            index_drop_timeout_secs: default_index_drop_timeout(),
            collection: default_collection(),
        }
    }

    #[test]
    fn test_timeout_durations() {
        let config = config("mongodb://localhost:27017");
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.index_provision_timeout(), Duration::from_secs(60));
        assert_eq!(config.index_drop_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(config("mongodb://localhost:27017").validate().is_ok());
        assert!(config("mongodb+srv://cluster.example.com").validate().is_ok());
    }

    #[test]
    fn test_validation_missing_uri() {
        assert_eq!(
            config("").validate(),
            Err(ValidationError::MissingRequired("MONGO_URI"))
        );
    }

    #[test]
    fn test_validation_invalid_uri() {
        assert_eq!(
            config("postgresql://localhost/test").validate(),
            Err(ValidationError::InvalidDatabaseUri)
        );
    }

    #[test]
    fn test_validation_pool_size() {
        let config = DatabaseConfig {
            max_pool_size: 0,
            ..config("mongodb://localhost:27017")
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidPoolSize(_))));
    }
}
