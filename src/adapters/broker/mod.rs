//! Broker adapters - tenant routing and reliable publishing.
//!
//! - `router` - single- and multi-tenant connection routing
//! - `producer` - retrying [`ReportPublisher`](crate::ports::ReportPublisher)
//! - `backoff` - exponential backoff with full jitter
//! - `lapin_connector` - AMQP connector for production
//! - `in_memory` - scriptable broker for tests

mod backoff;
mod headers;
mod in_memory;
mod lapin_connector;
mod producer;
mod router;
mod sleeper;

pub use backoff::{
    full_jitter, RetryPolicy, BACKOFF_FACTOR, INITIAL_BACKOFF, MAX_BACKOFF, MAX_RETRIES,
};
pub use headers::publish_headers;
pub use in_memory::{InMemoryBroker, InMemoryChannel, PublishedMessage};
pub use lapin_connector::{LapinChannel, LapinConnector};
pub use producer::ReportProducer;
pub use router::{BrokerRouter, ConnectionSlot, MultiTenantRouter, SingleTenantRouter, SlotState};
pub use sleeper::{RecordingSleeper, TokioSleeper};
