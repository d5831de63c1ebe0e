//! ReportPublisher port - Hands report requests to the worker fleet.

use async_trait::async_trait;
use thiserror::Error;

use crate::context::{ContextError, RequestContext};
use crate::domain::foundation::DomainError;
use crate::domain::report::ReportMessage;

use super::BrokerError;

/// Why a publish did not reach the broker.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Multi-tenant publishing without a tenant id. Never retried.
    #[error("tenant ID is required")]
    TenantRequired,

    /// The message could not be serialized. Never retried.
    #[error("failed to marshal report message")]
    Marshal(#[source] serde_json::Error),

    /// Exchange or routing key is empty.
    #[error("{0}")]
    InvalidTarget(#[from] DomainError),

    #[error("publish aborted after {attempts} attempt(s)")]
    Cancelled {
        attempts: u32,
        #[source]
        source: ContextError,
    },

    #[error("no broker channel after {attempts} attempt(s)")]
    ChannelUnavailable {
        attempts: u32,
        #[source]
        source: BrokerError,
    },

    #[error("publish failed after {attempts} attempt(s)")]
    Publish {
        attempts: u32,
        #[source]
        source: BrokerError,
    },
}

impl PublishError {
    /// Number of broker attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            PublishError::Cancelled { attempts, .. }
            | PublishError::ChannelUnavailable { attempts, .. }
            | PublishError::Publish { attempts, .. } => *attempts,
            _ => 0,
        }
    }

    /// The broker error that ended the loop, if any.
    pub fn broker_error(&self) -> Option<&BrokerError> {
        match self {
            PublishError::ChannelUnavailable { source, .. }
            | PublishError::Publish { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Port for publishing report requests.
///
/// Delivery is at-least-once: consumers deduplicate on `x-request-id`.
#[async_trait]
pub trait ReportPublisher: Send + Sync {
    async fn publish(
        &self,
        ctx: &RequestContext,
        exchange: &str,
        routing_key: &str,
        message: &ReportMessage,
    ) -> Result<(), PublishError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn ReportPublisher) {}

    #[test]
    fn tenant_required_message() {
        assert_eq!(PublishError::TenantRequired.to_string(), "tenant ID is required");
        assert_eq!(PublishError::TenantRequired.attempts(), 0);
    }

    #[test]
    fn publish_error_exposes_last_broker_error() {
        let err = PublishError::Publish {
            attempts: 6,
            source: BrokerError::io("connection reset"),
        };
        assert_eq!(err.attempts(), 6);
        assert!(matches!(err.broker_error(), Some(BrokerError::Transport(_))));
    }
}
