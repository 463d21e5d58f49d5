//! Common interface implemented by both the in-process and subprocess
//! engines. The shared `initialized/closed` discipline is a small helper
//! ([`LifecycleGuard`]) rather than an inheritance hierarchy; each engine
//! composes it instead of extending an abstract base.

use parking_lot::Mutex;
use pushtalk_foundation::events::Publisher;
use pushtalk_foundation::SttError;

use crate::events::EngineFailureEvent;
use crate::types::EngineResult;

pub trait SttEngine: Send + Sync {
    fn name(&self) -> &str;
    fn initialize(&self) -> Result<(), SttError>;
    fn close(&self) -> Result<(), SttError>;
    fn transcribe(&self, pcm: &[u8]) -> Result<EngineResult, SttError>;

    /// Publishes an [`EngineFailureEvent`] for every transcription failure,
    /// in addition to returning the failure to the caller. The watchdog is
    /// the only intended subscriber.
    fn failure_events(&self) -> &Publisher<EngineFailureEvent>;
}

/// Builds and publishes the `EngineFailureEvent` a failed `transcribe` call
/// owes the watchdog, tagging `reason` with the error's taxonomy kind.
pub fn publish_failure(publisher: &Publisher<EngineFailureEvent>, engine: &str, err: &SttError) {
    publisher.publish(&EngineFailureEvent {
        engine: engine.to_string(),
        at: std::time::Instant::now(),
        reason: err.to_string(),
        cause: None,
        context: None,
    });
}

/// `initialize()`/`close()` take a lock and call the closures exactly once
/// per transition; repeated calls are no-ops.
pub struct LifecycleGuard {
    initialized: Mutex<bool>,
}

impl Default for LifecycleGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleGuard {
    pub fn new() -> Self {
        Self {
            initialized: Mutex::new(false),
        }
    }

    pub fn initialize(&self, do_initialize: impl FnOnce() -> Result<(), SttError>) -> Result<(), SttError> {
        let mut guard = self.initialized.lock();
        if *guard {
            return Ok(());
        }
        do_initialize()?;
        *guard = true;
        Ok(())
    }

    pub fn close(&self, do_close: impl FnOnce() -> Result<(), SttError>) -> Result<(), SttError> {
        let mut guard = self.initialized.lock();
        if !*guard {
            return Ok(());
        }
        do_close()?;
        *guard = false;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        *self.initialized.lock()
    }
}
