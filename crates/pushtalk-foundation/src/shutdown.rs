//! Ctrl-C / SIGTERM handling, installed once at boot and awaited wherever
//! the main loop needs to block until an operator asks the process to stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

pub struct ShutdownHandler;

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandler {
    pub fn new() -> Self {
        Self
    }

    /// Installs the OS signal handlers and returns a handle that can be
    /// awaited from anywhere in the process.
    pub async fn install(self) -> ShutdownHandle {
        let handle = ShutdownHandle::new();

        let ctrl_c_handle = handle.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("shutdown requested via ctrl-c");
                    ctrl_c_handle.trigger();
                }
                Err(err) => tracing::error!(%err, "failed to install ctrl-c handler"),
            }
        });

        #[cfg(unix)]
        {
            let sigterm_handle = handle.clone();
            tokio::spawn(async move {
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                        tracing::info!("shutdown requested via SIGTERM");
                        sigterm_handle.trigger();
                    }
                    Err(err) => tracing::error!(%err, "failed to install SIGTERM handler"),
                }
            });
        }

        handle
    }
}

#[derive(Clone)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Blocks until shutdown has been requested. Returns immediately if it
    /// already was by the time this is called.
    pub async fn wait(&self) {
        if self.requested.load(Ordering::SeqCst) {
            return;
        }
        self.notify.notified().await;
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn trigger(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_returns_immediately_if_already_requested() {
        let handle = ShutdownHandle::new();
        handle.trigger();
        tokio::time::timeout(Duration::from_millis(50), handle.wait())
            .await
            .expect("wait should return immediately");
    }

    #[tokio::test]
    async fn wait_unblocks_when_triggered_concurrently() {
        let handle = ShutdownHandle::new();
        let trigger_handle = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger_handle.trigger();
        });
        tokio::time::timeout(Duration::from_millis(200), handle.wait())
            .await
            .expect("wait should unblock after trigger");
        assert!(handle.is_requested());
    }
}
