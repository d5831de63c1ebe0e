//! Adapters - Implementations of ports for external systems.
//!
//! - `broker` - AMQP routing, retrying producer and in-memory broker
//! - `mongo` - Document store repository
//! - `memory` - In-memory repository for tests and local runs
//! - `http` - Error translation and request decoding

pub mod broker;
pub mod http;
pub mod memory;
pub mod mongo;
