//! Broker ports - Interface to an AMQP-style message broker.
//!
//! The router works against these traits so that the retry loop can be
//! exercised without a live broker, and the lapin adapter stays the only
//! place that speaks AMQP.

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Header value on an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Text(String),
    Int(i64),
}

impl HeaderValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(value) => Some(value),
            HeaderValue::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            HeaderValue::Int(value) => Some(*value),
            HeaderValue::Text(_) => None,
        }
    }
}

/// A fully assembled message ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub body: Vec<u8>,
    pub headers: Vec<(String, HeaderValue)>,
    pub content_type: String,
    pub persistent: bool,
}

impl OutboundMessage {
    /// Persistent JSON message with no headers yet.
    pub fn json(body: Vec<u8>) -> Self {
        Self {
            body,
            headers: Vec::new(),
            content_type: "application/json".to_string(),
            persistent: true,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: HeaderValue) -> Self {
        self.headers.push((name.into(), value));
        self
    }

    /// Looks up a header by exact name.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// Broker transport failures.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("failed to connect to vhost {vhost}")]
    Connect {
        vhost: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    #[error("failed to open channel")]
    Channel(#[source] Box<dyn Error + Send + Sync>),

    #[error("channel is closed")]
    ChannelClosed,

    #[error("tenant id is required for multi-tenant routing")]
    MissingTenant,

    #[error("failed to publish to exchange {exchange}")]
    Publish {
        exchange: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    #[error("broker transport error: {0}")]
    Transport(String),
}

impl BrokerError {
    /// Transport error from a plain message, used by test doubles.
    pub fn io(message: impl Into<String>) -> Self {
        BrokerError::Transport(message.into())
    }
}

/// An open, publish-capable channel.
///
/// Implementations must be safe to share across tasks; publishes from
/// concurrent callers may interleave on the wire.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Publishes one message. Does not wait for a broker confirm.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: OutboundMessage,
    ) -> Result<(), BrokerError>;

    /// Returns true while the channel can accept publishes.
    fn is_open(&self) -> bool;

    /// Closes the channel and its connection. Errors are swallowed.
    async fn close(&self);
}

/// Dials the broker and opens a channel on a vhost.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    async fn connect(&self, vhost: &str) -> Result<Arc<dyn BrokerChannel>, BrokerError>;
}
