//! AMQP 0.9.1 connector backed by lapin.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lapin::options::BasicPublishOptions;
use lapin::types::{AMQPValue, FieldTable, LongString, ShortString};
use lapin::uri::{AMQPAuthority, AMQPUri, AMQPUserInfo};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::ports::{BrokerChannel, BrokerConnector, BrokerError, HeaderValue, OutboundMessage};

const PERSISTENT_DELIVERY: u8 = 2;

/// Dials a RabbitMQ-compatible broker.
pub struct LapinConnector {
    host: String,
    port: u16,
    username: String,
    password: SecretString,
    connect_timeout: Duration,
}

impl LapinConnector {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: SecretString,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password,
            connect_timeout,
        }
    }

    fn uri(&self, vhost: &str) -> AMQPUri {
        AMQPUri {
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: self.username.clone(),
                    password: self.password.expose_secret().clone(),
                },
                host: self.host.clone(),
                port: self.port,
            },
            vhost: vhost.to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl BrokerConnector for LapinConnector {
    async fn connect(&self, vhost: &str) -> Result<Arc<dyn BrokerChannel>, BrokerError> {
        let dial = Connection::connect_uri(self.uri(vhost), ConnectionProperties::default());
        let connection = match tokio::time::timeout(self.connect_timeout, dial).await {
            Ok(Ok(connection)) => connection,
            Ok(Err(err)) => {
                return Err(BrokerError::Connect {
                    vhost: vhost.to_string(),
                    source: Box::new(err),
                })
            }
            Err(elapsed) => {
                return Err(BrokerError::Connect {
                    vhost: vhost.to_string(),
                    source: Box::new(elapsed),
                })
            }
        };

        let channel = match connection.create_channel().await {
            Ok(channel) => channel,
            Err(err) => {
                let _ = connection.close(200, "OK").await;
                return Err(BrokerError::Channel(Box::new(err)));
            }
        };

        debug!(vhost = %vhost, host = %self.host, "amqp channel opened");
        Ok(Arc::new(LapinChannel {
            vhost: vhost.to_string(),
            connection,
            channel,
        }))
    }
}

/// Connection and channel pair on one vhost.
pub struct LapinChannel {
    vhost: String,
    connection: Connection,
    channel: Channel,
}

fn field_table(headers: &[(String, HeaderValue)]) -> FieldTable {
    let mut table = FieldTable::default();
    for (name, value) in headers {
        let value = match value {
            HeaderValue::Text(text) => AMQPValue::LongString(LongString::from(text.as_str())),
            HeaderValue::Int(number) => AMQPValue::LongLongInt(*number),
        };
        table.insert(ShortString::from(name.as_str()), value);
    }
    table
}

#[async_trait]
impl BrokerChannel for LapinChannel {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: OutboundMessage,
    ) -> Result<(), BrokerError> {
        if !self.is_open() {
            return Err(BrokerError::ChannelClosed);
        }

        let mut properties = BasicProperties::default()
            .with_content_type(ShortString::from(message.content_type.as_str()))
            .with_headers(field_table(&message.headers));
        if message.persistent {
            properties = properties.with_delivery_mode(PERSISTENT_DELIVERY);
        }

        // The returned confirm is not awaited: publisher confirms are off.
        self.channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                &message.body,
                properties,
            )
            .await
            .map(|_confirm| ())
            .map_err(|err| BrokerError::Publish {
                exchange: exchange.to_string(),
                source: Box::new(err),
            })
    }

    fn is_open(&self) -> bool {
        self.connection.status().connected() && self.channel.status().connected()
    }

    async fn close(&self) {
        if self.channel.status().connected() {
            if let Err(err) = self.channel.close(200, "OK").await {
                warn!(vhost = %self.vhost, error = %err, "failed to close amqp channel");
            }
        }
        if self.connection.status().connected() {
            if let Err(err) = self.connection.close(200, "OK").await {
                warn!(vhost = %self.vhost, error = %err, "failed to close amqp connection");
            }
        }
    }
}
