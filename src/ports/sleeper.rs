//! Sleeper port - Injectable delay between publish retries.

use std::time::Duration;

use async_trait::async_trait;

/// Suspends the caller for a duration.
///
/// Production code uses the tokio timer; tests substitute a recorder that
/// returns immediately and keeps the requested durations.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn Sleeper) {}
}
