//! In-memory broker for tests and local runs.
//!
//! Records every dial and publish, and can be scripted to fail dials or
//! publishes, or to simulate a broker restart that closes every open
//! channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{BrokerChannel, BrokerConnector, BrokerError, OutboundMessage};

/// A message accepted by the in-memory broker.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub vhost: String,
    pub exchange: String,
    pub routing_key: String,
    pub message: OutboundMessage,
}

#[derive(Default)]
struct BrokerState {
    failing_dials: u32,
    failing_publishes: u32,
    dials: Vec<String>,
    publish_attempts: u32,
    published: Vec<PublishedMessage>,
    channels: Vec<Arc<InMemoryChannel>>,
}

/// Scriptable broker implementing [`BrokerConnector`].
///
/// Cloning shares the underlying state, so a test can keep one handle for
/// assertions while the router owns another.
///
/// # Example
///
/// ```ignore
/// let broker = InMemoryBroker::new();
/// broker.fail_next_publishes(2);
/// let router = BrokerRouter::single(Arc::new(broker.clone()), "/");
/// // ... publish ...
/// assert_eq!(broker.publish_attempts(), 3);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // === Scripting ===

    /// The next `count` dials fail with a transport error.
    pub fn fail_next_connects(&self, count: u32) {
        self.lock().failing_dials = count;
    }

    /// The next `count` publishes fail with a transport error.
    pub fn fail_next_publishes(&self, count: u32) {
        self.lock().failing_publishes = count;
    }

    /// Every publish fails until scripted otherwise.
    pub fn fail_all_publishes(&self) {
        self.fail_next_publishes(u32::MAX);
    }

    /// Simulates a broker restart: every open channel is closed.
    pub fn restart(&self) {
        let channels = std::mem::take(&mut self.lock().channels);
        for channel in channels {
            channel.open.store(false, Ordering::SeqCst);
        }
    }

    // === Test Helpers ===

    /// Vhosts dialed, in order.
    pub fn dials(&self) -> Vec<String> {
        self.lock().dials.clone()
    }

    pub fn dial_count(&self) -> usize {
        self.lock().dials.len()
    }

    /// Publish calls that reached an open channel, successful or not.
    pub fn publish_attempts(&self) -> u32 {
        self.lock().publish_attempts
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.lock().published.clone()
    }

    /// Number of channels currently open.
    pub fn open_channels(&self) -> usize {
        self.lock()
            .channels
            .iter()
            .filter(|channel| channel.is_open())
            .count()
    }
}

#[async_trait]
impl BrokerConnector for InMemoryBroker {
    async fn connect(&self, vhost: &str) -> Result<Arc<dyn BrokerChannel>, BrokerError> {
        let mut state = self.lock();
        state.dials.push(vhost.to_string());
        if state.failing_dials > 0 {
            state.failing_dials -= 1;
            return Err(BrokerError::Connect {
                vhost: vhost.to_string(),
                source: Box::new(BrokerError::io("connection refused")),
            });
        }

        let channel = Arc::new(InMemoryChannel {
            vhost: vhost.to_string(),
            open: AtomicBool::new(true),
            broker: Arc::clone(&self.state),
        });
        state.channels.push(Arc::clone(&channel));
        Ok(channel)
    }
}

/// Channel handed out by [`InMemoryBroker`].
pub struct InMemoryChannel {
    vhost: String,
    open: AtomicBool,
    broker: Arc<Mutex<BrokerState>>,
}

impl InMemoryChannel {
    pub fn vhost(&self) -> &str {
        &self.vhost
    }
}

#[async_trait]
impl BrokerChannel for InMemoryChannel {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: OutboundMessage,
    ) -> Result<(), BrokerError> {
        if !self.is_open() {
            return Err(BrokerError::ChannelClosed);
        }

        let mut state = self.broker.lock().unwrap_or_else(PoisonError::into_inner);
        state.publish_attempts += 1;
        if state.failing_publishes > 0 {
            state.failing_publishes -= 1;
            return Err(BrokerError::Publish {
                exchange: exchange.to_string(),
                source: Box::new(BrokerError::io("connection reset by peer")),
            });
        }

        state.published.push(PublishedMessage {
            vhost: self.vhost.clone(),
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            message,
        });
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}
