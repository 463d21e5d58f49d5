//! Lock primitives shared by the capture pipeline and the STT engines:
//! the single-active-session guard (4.G) and the bounded-concurrency
//! semaphore wrapper (4.H).

use crate::error::SttError;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Guards against a second capture session starting while one is already
/// active. Sits above the capture service itself so that the hotkey
/// thread and any out-of-band shutdown path cannot race to start/stop
/// the same worker.
pub struct CaptureStateMachine {
    active: Mutex<Option<Uuid>>,
}

impl Default for CaptureStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureStateMachine {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
        }
    }

    /// Succeeds iff no session is currently active.
    pub fn start(&self, new: Uuid) -> bool {
        let mut guard = self.active.lock();
        if guard.is_some() {
            return false;
        }
        *guard = Some(new);
        true
    }

    /// Succeeds iff `id` is the currently active session.
    pub fn stop(&self, id: Uuid) -> bool {
        let mut guard = self.active.lock();
        if *guard == Some(id) {
            *guard = None;
            true
        } else {
            false
        }
    }

    /// Clears the active session unconditionally, returning whatever was there.
    pub fn cancel(&self) -> Option<Uuid> {
        self.active.lock().take()
    }

    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn get_active(&self) -> Option<Uuid> {
        *self.active.lock()
    }
}

struct SemaphoreState {
    available: usize,
}

/// A named, bounded-concurrency gate. Engines acquire a permit
/// before doing STT work and must release it on every exit path; wrapping
/// the raw count in [`ConcurrencyPermit`] makes release automatic on drop
/// even when the guarded call panics or returns early. Blocking rather than
/// `async` because engines run their calls on plain `std::thread`s spawned
/// by [`crate`]'s sibling crates (the STT dispatcher's executor, the
/// subprocess gobbler threads) with no `tokio` runtime in scope.
pub struct ConcurrencyGuard {
    engine_name: String,
    state: Arc<(Mutex<SemaphoreState>, Condvar)>,
}

pub struct ConcurrencyPermit {
    state: Arc<(Mutex<SemaphoreState>, Condvar)>,
}

impl Drop for ConcurrencyPermit {
    fn drop(&mut self) {
        let (lock, cvar) = &*self.state;
        lock.lock().available += 1;
        cvar.notify_one();
    }
}

impl ConcurrencyGuard {
    pub fn new(engine_name: impl Into<String>, max_permits: usize) -> Self {
        Self {
            engine_name: engine_name.into(),
            state: Arc::new((Mutex::new(SemaphoreState { available: max_permits }), Condvar::new())),
        }
    }

    /// Waits up to `timeout` for a permit. On timeout, logs a warning
    /// tagged with the engine name and returns `SttError::ConcurrencyLimit`;
    /// the caller is responsible for turning that into an `EngineFailureEvent`.
    pub fn acquire(&self, timeout: Duration) -> Result<ConcurrencyPermit, SttError> {
        let (lock, cvar) = &*self.state;
        let mut guard = lock.lock();
        let deadline = Instant::now() + timeout;
        while guard.available == 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(
                    engine = %self.engine_name,
                    timeout_ms = timeout.as_millis() as u64,
                    "concurrency guard acquire timed out"
                );
                return Err(SttError::ConcurrencyLimit);
            }
            let timed_out = cvar.wait_for(&mut guard, remaining).timed_out();
            if timed_out && guard.available == 0 {
                tracing::warn!(
                    engine = %self.engine_name,
                    timeout_ms = timeout.as_millis() as u64,
                    "concurrency guard acquire timed out"
                );
                return Err(SttError::ConcurrencyLimit);
            }
        }
        guard.available -= 1;
        Ok(ConcurrencyPermit {
            state: self.state.clone(),
        })
    }

    /// Number of permits currently available, for tests and diagnostics.
    pub fn available_permits(&self) -> usize {
        self.state.0.lock().available
    }
}
