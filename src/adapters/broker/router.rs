//! Tenant-aware broker router.
//!
//! Two shapes, picked at deployment time:
//!
//! - **Single tenant**: one shared connection slot on a fixed vhost.
//! - **Multi tenant**: one lazily dialed slot per tenant, pinned to the
//!   tenant's vhost.
//!
//! Each slot moves through `Closed -> Dialing -> Open -> Broken -> Closed`.
//! The slot mutex is held for the whole dial, so concurrent callers that find
//! the slot closed wait for one reconnect instead of dialing in parallel.
//! The router never retries a failed dial; that is the producer's job.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::context::RequestContext;
use crate::ports::{BrokerChannel, BrokerConnector, BrokerError};

/// Lifecycle of a connection slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Closed,
    Dialing,
    Open,
    Broken,
}

struct SlotInner {
    state: SlotState,
    channel: Option<Arc<dyn BrokerChannel>>,
}

/// One connection plus channel on one vhost.
pub struct ConnectionSlot {
    vhost: String,
    connector: Arc<dyn BrokerConnector>,
    inner: Mutex<SlotInner>,
}

impl ConnectionSlot {
    pub fn new(connector: Arc<dyn BrokerConnector>, vhost: impl Into<String>) -> Self {
        Self {
            vhost: vhost.into(),
            connector,
            inner: Mutex::new(SlotInner {
                state: SlotState::Closed,
                channel: None,
            }),
        }
    }

    pub fn vhost(&self) -> &str {
        &self.vhost
    }

    pub async fn state(&self) -> SlotState {
        self.inner.lock().await.state
    }

    /// Returns an open channel, dialing first if needed.
    pub async fn acquire(&self) -> Result<Arc<dyn BrokerChannel>, BrokerError> {
        let mut inner = self.inner.lock().await;

        if let Some(channel) = &inner.channel {
            if channel.is_open() {
                return Ok(Arc::clone(channel));
            }
            // Closed by the broker since the last publish.
            warn!(vhost = %self.vhost, "broker channel closed remotely");
            inner.state = SlotState::Broken;
        }
        if let Some(stale) = inner.channel.take() {
            stale.close().await;
        }

        inner.state = SlotState::Dialing;
        debug!(vhost = %self.vhost, "dialing broker");
        match self.connector.connect(&self.vhost).await {
            Ok(channel) => {
                info!(vhost = %self.vhost, "broker channel open");
                inner.channel = Some(Arc::clone(&channel));
                inner.state = SlotState::Open;
                Ok(channel)
            }
            Err(err) => {
                inner.state = SlotState::Closed;
                Err(err)
            }
        }
    }

    /// Moves the slot to `Broken` if `channel` is still the current one, and
    /// releases it. A channel already replaced by a newer dial is ignored.
    pub async fn mark_broken(&self, channel: &Arc<dyn BrokerChannel>) {
        let mut inner = self.inner.lock().await;
        let is_current = inner
            .channel
            .as_ref()
            .map_or(false, |current| same_channel(current, channel));
        if !is_current {
            return;
        }

        inner.state = SlotState::Broken;
        if let Some(stale) = inner.channel.take() {
            stale.close().await;
        }
        inner.state = SlotState::Closed;
    }

    /// Closes the current channel, if any.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(channel) = inner.channel.take() {
            channel.close().await;
        }
        inner.state = SlotState::Closed;
    }
}

fn same_channel(a: &Arc<dyn BrokerChannel>, b: &Arc<dyn BrokerChannel>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Router for a single shared vhost.
pub struct SingleTenantRouter {
    slot: ConnectionSlot,
}

impl SingleTenantRouter {
    pub fn new(connector: Arc<dyn BrokerConnector>, vhost: impl Into<String>) -> Self {
        Self {
            slot: ConnectionSlot::new(connector, vhost),
        }
    }

    /// Returns the shared channel, reconnecting when it is not open.
    pub async fn ensure_channel(&self) -> Result<Arc<dyn BrokerChannel>, BrokerError> {
        self.slot.acquire().await
    }

    pub fn slot(&self) -> &ConnectionSlot {
        &self.slot
    }
}

/// Router with one slot per tenant vhost.
pub struct MultiTenantRouter {
    connector: Arc<dyn BrokerConnector>,
    vhost_prefix: String,
    slots: RwLock<HashMap<String, Arc<ConnectionSlot>>>,
}

impl MultiTenantRouter {
    pub fn new(connector: Arc<dyn BrokerConnector>, vhost_prefix: impl Into<String>) -> Self {
        Self {
            connector,
            vhost_prefix: vhost_prefix.into(),
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Vhost a tenant's traffic is pinned to.
    pub fn vhost_for(&self, tenant_id: &str) -> String {
        format!("{}{}", self.vhost_prefix, tenant_id)
    }

    async fn slot_for(&self, tenant_id: &str) -> Arc<ConnectionSlot> {
        if let Some(slot) = self.slots.read().await.get(tenant_id) {
            return Arc::clone(slot);
        }

        let mut slots = self.slots.write().await;
        let slot = slots.entry(tenant_id.to_string()).or_insert_with(|| {
            Arc::new(ConnectionSlot::new(
                Arc::clone(&self.connector),
                self.vhost_for(tenant_id),
            ))
        });
        Arc::clone(slot)
    }

    /// Returns the tenant's channel, dialing its vhost on first use.
    ///
    /// # Errors
    ///
    /// - `MissingTenant` for an empty tenant id
    /// - the connector's error when the dial fails
    pub async fn channel_for(
        &self,
        ctx: &RequestContext,
        tenant_id: &str,
    ) -> Result<Arc<dyn BrokerChannel>, BrokerError> {
        if tenant_id.is_empty() {
            return Err(BrokerError::MissingTenant);
        }
        let slot = self.slot_for(tenant_id).await;
        debug!(
            request_id = %ctx.request_id(),
            tenant_id = %tenant_id,
            vhost = %slot.vhost(),
            "routing publish to tenant vhost"
        );
        slot.acquire().await
    }

    /// Marks the tenant's channel broken if it is still current.
    pub async fn mark_broken(&self, tenant_id: &str, channel: &Arc<dyn BrokerChannel>) {
        let slot = self.slots.read().await.get(tenant_id).cloned();
        if let Some(slot) = slot {
            slot.mark_broken(channel).await;
        }
    }

    /// Number of tenants with a slot.
    pub async fn tenant_count(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn close(&self) {
        let slots: Vec<_> = self.slots.read().await.values().cloned().collect();
        for slot in slots {
            slot.close().await;
        }
    }
}

/// Deployment-mode router.
pub enum BrokerRouter {
    Single(SingleTenantRouter),
    Multi(MultiTenantRouter),
}

impl BrokerRouter {
    pub fn single(connector: Arc<dyn BrokerConnector>, vhost: impl Into<String>) -> Self {
        BrokerRouter::Single(SingleTenantRouter::new(connector, vhost))
    }

    pub fn multi(connector: Arc<dyn BrokerConnector>, vhost_prefix: impl Into<String>) -> Self {
        BrokerRouter::Multi(MultiTenantRouter::new(connector, vhost_prefix))
    }

    pub fn is_multi_tenant(&self) -> bool {
        matches!(self, BrokerRouter::Multi(_))
    }

    /// Channel for the request: the shared one, or the tenant's.
    pub async fn acquire(&self, ctx: &RequestContext) -> Result<Arc<dyn BrokerChannel>, BrokerError> {
        match self {
            BrokerRouter::Single(router) => router.ensure_channel().await,
            BrokerRouter::Multi(router) => router.channel_for(ctx, ctx.tenant_id()).await,
        }
    }

    /// Reports a publish failure on `channel`.
    pub async fn mark_broken(&self, ctx: &RequestContext, channel: &Arc<dyn BrokerChannel>) {
        match self {
            BrokerRouter::Single(router) => router.slot().mark_broken(channel).await,
            BrokerRouter::Multi(router) => router.mark_broken(ctx.tenant_id(), channel).await,
        }
    }

    /// Closes every open channel.
    pub async fn close(&self) {
        match self {
            BrokerRouter::Single(router) => router.slot().close().await,
            BrokerRouter::Multi(router) => router.close().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::broker::InMemoryBroker;

    fn connector(broker: &InMemoryBroker) -> Arc<dyn BrokerConnector> {
        Arc::new(broker.clone())
    }

    #[tokio::test]
    async fn single_router_reuses_open_channel() {
        let broker = InMemoryBroker::new();
        let router = SingleTenantRouter::new(connector(&broker), "/");

        let first = router.ensure_channel().await.unwrap();
        let second = router.ensure_channel().await.unwrap();
        assert!(same_channel(&first, &second));
        assert_eq!(broker.dial_count(), 1);
        assert_eq!(router.slot().state().await, SlotState::Open);
    }

    #[tokio::test]
    async fn single_router_redials_after_restart() {
        let broker = InMemoryBroker::new();
        let router = SingleTenantRouter::new(connector(&broker), "/");

        let first = router.ensure_channel().await.unwrap();
        broker.restart();
        let second = router.ensure_channel().await.unwrap();
        assert!(!same_channel(&first, &second));
        assert!(second.is_open());
        assert_eq!(broker.dial_count(), 2);
    }

    #[tokio::test]
    async fn dial_error_is_surfaced_without_retry() {
        let broker = InMemoryBroker::new();
        broker.fail_next_connects(1);
        let router = SingleTenantRouter::new(connector(&broker), "/");

        assert!(matches!(
            router.ensure_channel().await,
            Err(BrokerError::Connect { .. })
        ));
        assert_eq!(broker.dial_count(), 1);
        assert_eq!(router.slot().state().await, SlotState::Closed);
        assert!(router.ensure_channel().await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_dial() {
        let broker = InMemoryBroker::new();
        let router = Arc::new(SingleTenantRouter::new(connector(&broker), "/"));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let router = Arc::clone(&router);
                tokio::spawn(async move { router.ensure_channel().await.map(|_| ()) })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(broker.dial_count(), 1);
    }

    #[tokio::test]
    async fn stale_mark_broken_is_ignored() {
        let broker = InMemoryBroker::new();
        let router = SingleTenantRouter::new(connector(&broker), "/");

        let first = router.ensure_channel().await.unwrap();
        router.slot().mark_broken(&first).await;
        assert!(!first.is_open());
        let second = router.ensure_channel().await.unwrap();

        router.slot().mark_broken(&first).await;
        assert!(second.is_open());
        assert_eq!(router.slot().state().await, SlotState::Open);
    }

    #[tokio::test]
    async fn tenants_get_distinct_channels_and_vhosts() {
        let broker = InMemoryBroker::new();
        let router = MultiTenantRouter::new(connector(&broker), "tenant_");
        let ctx_a = RequestContext::new().with_tenant_id("A");
        let ctx_b = RequestContext::new().with_tenant_id("B");

        let a = router.channel_for(&ctx_a, "A").await.unwrap();
        let b = router.channel_for(&ctx_b, "B").await.unwrap();
        assert!(!same_channel(&a, &b));
        assert_eq!(broker.dials(), vec!["tenant_A".to_string(), "tenant_B".to_string()]);

        let again = router.channel_for(&ctx_a, "A").await.unwrap();
        assert!(same_channel(&a, &again));
        assert_eq!(router.tenant_count().await, 2);
    }

    #[tokio::test]
    async fn tenants_stay_distinct_across_reconnects() {
        let broker = InMemoryBroker::new();
        let router = MultiTenantRouter::new(connector(&broker), "");
        let ctx_a = RequestContext::new().with_tenant_id("A");
        let ctx_b = RequestContext::new().with_tenant_id("B");

        router.channel_for(&ctx_a, "A").await.unwrap();
        router.channel_for(&ctx_b, "B").await.unwrap();
        broker.restart();

        let a = router.channel_for(&ctx_a, "A").await.unwrap();
        let b = router.channel_for(&ctx_b, "B").await.unwrap();
        assert!(!same_channel(&a, &b));
        assert_eq!(broker.dials()[2..], ["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn empty_tenant_is_rejected_before_dialing() {
        let broker = InMemoryBroker::new();
        let router = BrokerRouter::multi(connector(&broker), "");
        let result = router.acquire(&RequestContext::background()).await;
        assert!(matches!(result, Err(BrokerError::MissingTenant)));
        assert_eq!(broker.dial_count(), 0);
    }
}
