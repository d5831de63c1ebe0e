//! Cooperative cancellation for request-scoped work.

use thiserror::Error;
use tokio::sync::watch;

/// Why a request context stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Receiving side of a cancellation signal.
///
/// The default signal is never cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    rx: Option<watch::Receiver<bool>>,
}

/// Sending side of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancellationSignal {
    /// Creates a linked handle and signal.
    pub fn pair() -> (CancelHandle, CancellationSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancellationSignal { rx: Some(rx) })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().map_or(false, |rx| *rx.borrow())
    }

    /// Resolves once cancellation is requested.
    ///
    /// Stays pending forever when the handle was dropped without cancelling.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}

impl CancelHandle {
    /// Requests cancellation of every linked signal.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}
