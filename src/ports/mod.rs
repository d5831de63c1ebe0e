//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Broker Ports
//!
//! - `BrokerConnector` / `BrokerChannel` - Dial a vhost and publish on it
//! - `Sleeper` - Injectable delay between publish retries
//! - `ReportPublisher` - Publish a report request with retry
//!
//! ## Storage Ports
//!
//! - `ReportRepository` - Tenant-routed report persistence

mod broker;
mod report_publisher;
mod report_repository;
mod sleeper;

pub use broker::{BrokerChannel, BrokerConnector, BrokerError, HeaderValue, OutboundMessage};
pub use report_publisher::{PublishError, ReportPublisher};
pub use report_repository::{ReportRepository, RepositoryError};
pub use sleeper::Sleeper;
