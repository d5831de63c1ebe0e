//! Shared (static) document-store connection.
//!
//! Used whenever a request carries no tenant database.

use std::time::Duration;

use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

/// Client plus the name of the default database.
#[derive(Clone, Debug)]
pub struct MongoConnection {
    client: Client,
    database: String,
}

impl MongoConnection {
    /// Parses `uri` and builds a pooled client. The driver connects lazily.
    pub async fn connect(
        uri: &SecretString,
        database: impl Into<String>,
        max_pool_size: u32,
        connect_timeout: Duration,
    ) -> Result<Self, mongodb::error::Error> {
        let mut options = ClientOptions::parse(uri.expose_secret()).await?;
        options.max_pool_size = Some(max_pool_size);
        options.connect_timeout = Some(connect_timeout);
        options.app_name = Some("report-relay".to_string());

        let client = Client::with_options(options)?;
        let database = database.into();
        info!(database = %database, "document store client ready");
        Ok(Self { client, database })
    }

    /// Wraps an existing client.
    pub fn from_client(client: Client, database: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
        }
    }

    /// The shared database.
    pub fn get_db(&self) -> Database {
        self.client.database(&self.database)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}
