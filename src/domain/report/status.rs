//! Report lifecycle labels.
//!
//! Status is stored as a free-form label so workers can introduce new
//! intermediate states without a schema change.

/// Request accepted, waiting for or being rendered by a worker.
pub const PROCESSING: &str = "processing";

/// Artifact rendered successfully.
pub const FINISHED: &str = "finished";

/// Rendering failed.
pub const ERROR: &str = "error";

/// Request withdrawn by the caller.
pub const DELETED: &str = "deleted";

/// Returns true for labels after which no further work happens.
pub fn is_terminal(status: &str) -> bool {
    matches!(status, FINISHED | ERROR | DELETED)
}
