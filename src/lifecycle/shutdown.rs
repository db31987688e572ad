//! Shutdown coordination for the launcher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

/// Coordinator for shutdown requests.
///
/// The first [`trigger`](Self::trigger) wins; later calls are no-ops. Any
/// number of tasks can [`wait`](Self::wait) for it, including ones that
/// start waiting after the trigger fired.
#[derive(Debug, Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    fired: AtomicBool,
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                fired: AtomicBool::new(false),
                tx,
            }),
        }
    }

    /// Request shutdown. Returns `true` only for the call that fired it.
    pub fn trigger(&self) -> bool {
        let first = self
            .inner
            .fired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if first {
            self.inner.tx.send_replace(true);
        }
        first
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown has been requested.
    pub async fn wait(&self) {
        let mut rx = self.inner.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
