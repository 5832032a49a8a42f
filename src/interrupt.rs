//! Interrupt capture for a connection run.
//!
//! Once [`Interrupt::listen`] is called, SIGINT (and on Unix SIGTERM and
//! SIGHUP) no longer terminate the process; they flip a flag that prompts
//! and the executor observe, so the run can unwind through its teardown.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Shared interrupt flag.
#[derive(Debug, Clone)]
pub struct Interrupt {
    tx: Arc<watch::Sender<bool>>,
}

impl Interrupt {
    /// Creates a flag that is only set by [`Interrupt::trigger`].
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Creates a flag set by Ctrl-C, or by SIGTERM/SIGHUP on Unix.
    ///
    /// Handlers are installed before this returns. Must be called from
    /// within a Tokio runtime.
    #[must_use]
    pub fn listen() -> Self {
        let interrupt = Self::new();
        let handle = interrupt.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C");
                handle.trigger();
            }
        });

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            for (kind, name) in [
                (SignalKind::terminate(), "SIGTERM"),
                (SignalKind::hangup(), "SIGHUP"),
            ] {
                match signal(kind) {
                    Ok(mut stream) => {
                        let handle = interrupt.clone();
                        tokio::spawn(async move {
                            if stream.recv().await.is_some() {
                                info!("Received {}", name);
                                handle.trigger();
                            }
                        });
                    }
                    Err(e) => tracing::warn!("Cannot handle {}: {}", name, e),
                }
            }
        }

        interrupt
    }

    /// Sets the flag.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Returns true once the flag is set.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the flag is set.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|set| *set).await;
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}
