//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, classification)
//! - `report` - Report entity, filters, metadata, list query and wire message

pub mod foundation;
pub mod report;
