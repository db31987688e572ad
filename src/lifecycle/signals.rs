//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGINT, SIGTERM)
//! - Run the interrupt callback exactly once
//! - Ignore (and log) any further signals
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are registered before `install` returns
//! - The listener task is aborted when the guard is dropped

use std::sync::Mutex;

use tokio::task::JoinHandle;

/// Runs a callback at most once, however often it is fired.
pub struct OnceHandler<F> {
    callback: Mutex<Option<F>>,
}

impl<F: FnOnce()> OnceHandler<F> {
    pub fn new(callback: F) -> Self {
        Self {
            callback: Mutex::new(Some(callback)),
        }
    }

    /// Run the callback if it has not run yet. Returns whether it ran.
    pub fn fire(&self) -> bool {
        let callback = self
            .callback
            .lock()
            .expect("signal handler mutex poisoned")
            .take();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.callback
            .lock()
            .expect("signal handler mutex poisoned")
            .is_none()
    }
}

/// Keeps interrupt/termination signal handling installed while alive.
pub struct SignalGuard {
    task: JoinHandle<()>,
}

impl SignalGuard {
    /// Install handlers that call `on_interrupt` on the first SIGINT or SIGTERM.
    ///
    /// Must be called from within a Tokio runtime.
    #[cfg(unix)]
    pub fn install<F>(on_interrupt: F) -> std::io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        let handler = OnceHandler::new(on_interrupt);

        let task = tokio::spawn(async move {
            loop {
                let name = tokio::select! {
                    received = sigint.recv() => match received {
                        Some(()) => "SIGINT",
                        None => break,
                    },
                    received = sigterm.recv() => match received {
                        Some(()) => "SIGTERM",
                        None => break,
                    },
                };
                dispatch(&handler, name);
            }
        });

        Ok(Self { task })
    }

    /// Install a handler that calls `on_interrupt` on the first Ctrl+C.
    #[cfg(not(unix))]
    pub fn install<F>(on_interrupt: F) -> std::io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let handler = OnceHandler::new(on_interrupt);
        let task = tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                dispatch(&handler, "Ctrl+C");
            }
        });
        Ok(Self { task })
    }
}

fn dispatch<F: FnOnce()>(handler: &OnceHandler<F>, name: &str) {
    if handler.fire() {
        tracing::info!(signal = name, "Shutdown signal received");
    } else {
        tracing::debug!(signal = name, "Already shutting down, signal ignored");
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn handler_runs_at_most_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = OnceHandler::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!handler.has_fired());
        assert!(handler.fire());
        assert!(!handler.fire());
        assert!(!handler.fire());
        assert!(handler.has_fired());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_fires_run_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = Arc::new(OnceHandler::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let handler = handler.clone();
                std::thread::spawn(move || handler.fire())
            })
            .collect();
        let fired = threads
            .into_iter()
            .map(|t| t.join().unwrap())
            .filter(|fired| *fired)
            .count();

        assert_eq!(fired, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn install_and_drop() {
        let guard = SignalGuard::install(|| {}).unwrap();
        drop(guard);
    }
}
