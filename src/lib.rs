//! Report Relay - reliable outbound publishing core for report requests.
//!
//! Accepts a report-generation request, persists a durable record of it in a
//! document store and hands it to the rendering fleet through an AMQP broker,
//! with per-tenant isolation and at-least-once delivery.

pub mod adapters;
pub mod application;
pub mod config;
pub mod context;
pub mod domain;
pub mod ports;
pub mod telemetry;
