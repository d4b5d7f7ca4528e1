// src/sched/cancel.rs

//! Cooperative cancellation.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::watch;

/// Cancellation token shared by the scheduler, every task, and the build
/// driver. Cancelling is one-way; the first cause wins.
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<Option<Arc<str>>>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { state: Arc::new(tx) }
    }

    /// Cancel with a cause. Later calls are ignored.
    pub fn cancel(&self, cause: &str) {
        self.state.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(Arc::from(cause));
            true
        });
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// The cancellation cause, if cancelled.
    pub fn cause(&self) -> Option<Arc<str>> {
        self.state.borrow().clone()
    }

    /// Completes when the token is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // Err would mean the sender was dropped, which cannot happen while
        // `self` holds it.
        let _ = rx.wait_for(|state| state.is_some()).await;
    }

    /// An error carrying the cancellation cause.
    pub fn error(&self) -> anyhow::Error {
        match self.cause() {
            Some(cause) => anyhow!("{cause}"),
            None => anyhow!("cancelled"),
        }
    }

    /// Err with the cause if the token is already cancelled.
    pub fn check(&self) -> anyhow::Result<()> {
        if self.is_cancelled() {
            Err(self.error())
        } else {
            Ok(())
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
