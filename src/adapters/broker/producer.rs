//! Report producer - publishes report requests with retry.
//!
//! Each publish runs up to `max_retries + 1` attempts. An attempt first
//! acquires a channel from the router, then publishes on it. A failure in
//! either step is followed by a full-jitter sleep before the next attempt,
//! except after the last one, where the error is returned. Serialization and
//! tenant errors fail immediately, and a finished request context aborts the
//! loop at the start of an attempt or during a sleep.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info_span, warn, Instrument};

use crate::context::RequestContext;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::report::ReportMessage;
use crate::ports::{OutboundMessage, PublishError, ReportPublisher, Sleeper};

use super::backoff::{full_jitter, RetryPolicy};
use super::headers::publish_headers;
use super::router::BrokerRouter;
use super::sleeper::TokioSleeper;

/// Publishes [`ReportMessage`]s through a [`BrokerRouter`].
pub struct ReportProducer {
    router: Arc<BrokerRouter>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl ReportProducer {
    /// Producer sleeping on the tokio timer.
    pub fn new(router: Arc<BrokerRouter>, policy: RetryPolicy) -> Self {
        Self::with_sleeper(router, policy, Arc::new(TokioSleeper))
    }

    /// Producer with an injected sleep primitive.
    pub fn with_sleeper(
        router: Arc<BrokerRouter>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            router,
            policy,
            sleeper,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn router(&self) -> &BrokerRouter {
        &self.router
    }

    fn validate_target(exchange: &str, routing_key: &str) -> Result<(), DomainError> {
        let mut err: Option<DomainError> = None;
        for (field, value) in [("exchange", exchange), ("routingKey", routing_key)] {
            if value.trim().is_empty() {
                err = Some(
                    err.unwrap_or_else(|| {
                        DomainError::new(
                            ErrorCode::InvalidPublishTarget,
                            "exchange and routing key must be non-empty",
                        )
                    })
                    .with_field(field, "required"),
                );
            }
        }
        err.map_or(Ok(()), Err)
    }

    async fn publish_with_retry(
        &self,
        ctx: &RequestContext,
        exchange: &str,
        routing_key: &str,
        body: Vec<u8>,
    ) -> Result<(), PublishError> {
        let trace = ctx.trace().child();
        let max_retries = self.policy.max_retries;
        let mut backoff = self.policy.first_backoff();
        let mut attempt: u32 = 0;

        loop {
            if let Some(source) = ctx.err() {
                return Err(PublishError::Cancelled {
                    attempts: attempt,
                    source,
                });
            }

            let failure = match self.router.acquire(ctx).await {
                Err(source) => {
                    if attempt == max_retries {
                        error!(attempt, error = %source, "no broker channel, giving up");
                        return Err(PublishError::ChannelUnavailable {
                            attempts: attempt + 1,
                            source,
                        });
                    }
                    warn!(attempt, error = %source, "failed to acquire broker channel");
                    None
                }
                Ok(channel) => {
                    let message = OutboundMessage {
                        headers: publish_headers(ctx, &trace, attempt),
                        ..OutboundMessage::json(body.clone())
                    };
                    match channel.publish(exchange, routing_key, message).await {
                        Ok(()) => return Ok(()),
                        Err(source) => {
                            self.router.mark_broken(ctx, &channel).await;
                            if attempt == max_retries {
                                error!(attempt, error = %source, "publish failed, giving up");
                                return Err(PublishError::Publish {
                                    attempts: attempt + 1,
                                    source,
                                });
                            }
                            Some(source)
                        }
                    }
                }
            };

            let delay = full_jitter(backoff);
            if let Some(source) = &failure {
                warn!(attempt, delay_ms = delay.as_millis() as u64, error = %source, "publish failed, retrying");
            }

            tokio::select! {
                biased;
                source = ctx.done() => {
                    return Err(PublishError::Cancelled {
                        attempts: attempt + 1,
                        source,
                    });
                }
                _ = self.sleeper.sleep(delay) => {}
            }

            backoff = self.policy.next_backoff(backoff);
            attempt += 1;
        }
    }
}

#[async_trait]
impl ReportPublisher for ReportProducer {
    async fn publish(
        &self,
        ctx: &RequestContext,
        exchange: &str,
        routing_key: &str,
        message: &ReportMessage,
    ) -> Result<(), PublishError> {
        let span = info_span!(
            "report_producer.publish",
            request_id = %ctx.request_id(),
            tenant_id = %ctx.tenant_id(),
            report_id = %message.report_id,
            exchange = %exchange,
            routing_key = %routing_key,
        );

        async move {
            if self.router.is_multi_tenant() && ctx.tenant_id().is_empty() {
                return Err(PublishError::TenantRequired);
            }
            Self::validate_target(exchange, routing_key)?;
            let body = serde_json::to_vec(message).map_err(PublishError::Marshal)?;

            self.publish_with_retry(ctx, exchange, routing_key, body)
                .await
        }
        .instrument(span)
        .await
    }
}
