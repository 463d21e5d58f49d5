//! Restart-budget watchdog: a sliding-window failure count per engine
//! drives HEALTHY -> RESTARTING -> DISABLED transitions, with a cooldown
//! that eventually lets a disabled engine try again.
//!
//! Cooldown expiry is resolved the same way from both entry points —
//! the next failure on a disabled engine, or a scheduled `tick` — so an
//! engine that has gone quiet after being disabled still ages back into
//! `RESTARTING` without needing another failure to drive it.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use pushtalk_telemetry::Metrics;
use tracing::{info, warn};

use crate::engine::SttEngine;
use crate::events::{EngineDisabledEvent, EngineFailureEvent, EngineRecoveredEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogStatus {
    Healthy,
    Restarting,
    Disabled,
}

#[derive(Debug, Clone, Copy)]
pub struct WatchdogConfig {
    pub window: Duration,
    pub max_restarts_in_window: usize,
    pub cooldown: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_restarts_in_window: 3,
            cooldown: Duration::from_secs(600),
        }
    }
}

struct EngineState {
    failures: VecDeque<Instant>,
    status: WatchdogStatus,
    cooldown_until: Option<Instant>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            failures: VecDeque::new(),
            status: WatchdogStatus::Healthy,
            cooldown_until: None,
        }
    }

    fn prune(&mut self, window: Duration, now: Instant) {
        while let Some(front) = self.failures.front() {
            if now.duration_since(*front) > window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }

    fn expire_cooldown_if_due(&mut self, now: Instant, engine: &str) {
        if self.status == WatchdogStatus::Disabled {
            if let Some(until) = self.cooldown_until {
                if now >= until {
                    info!(engine, "watchdog cooldown expired, retrying disabled engine");
                    self.status = WatchdogStatus::Restarting;
                    self.cooldown_until = None;
                    self.failures.clear();
                }
            }
        }
    }
}

/// One watchdog instance per engine name, created lazily on first failure.
pub struct Watchdog {
    config: WatchdogConfig,
    engines: Mutex<std::collections::HashMap<String, EngineState>>,
    metrics: Option<std::sync::Arc<Metrics>>,
}

impl Watchdog {
    pub fn new(config: WatchdogConfig) -> Self {
        Self {
            config,
            engines: Mutex::new(std::collections::HashMap::new()),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: std::sync::Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Records a failure and returns the resulting status. Callers use
    /// `Restarting` as the signal to close+reinitialize the engine.
    pub fn record_failure(&self, event: &EngineFailureEvent) -> WatchdogStatus {
        let mut engines = self.engines.lock();
        let state = engines
            .entry(event.engine.clone())
            .or_insert_with(EngineState::new);

        state.expire_cooldown_if_due(event.at, &event.engine);
        if state.status == WatchdogStatus::Disabled {
            return WatchdogStatus::Disabled;
        }

        state.prune(self.config.window, event.at);
        state.failures.push_back(event.at);
        if state.failures.len() > self.config.max_restarts_in_window {
            state.status = WatchdogStatus::Disabled;
            state.cooldown_until = Some(event.at + self.config.cooldown);
            warn!(engine = %event.engine, "watchdog disabling engine after restart budget exceeded");
            if let Some(metrics) = &self.metrics {
                metrics.record_watchdog_disable();
            }
        } else {
            state.status = WatchdogStatus::Restarting;
            info!(engine = %event.engine, attempt = state.failures.len(), "watchdog restarting engine");
            if let Some(metrics) = &self.metrics {
                metrics.record_watchdog_restart();
            }
        }
        state.status
    }

    /// A successful transcription clears the `RESTARTING` flag but does not
    /// reset the failure deque — the window itself still bounds the count.
    pub fn record_recovery(&self, event: &EngineRecoveredEvent) {
        let mut engines = self.engines.lock();
        if let Some(state) = engines.get_mut(&event.engine) {
            if state.status == WatchdogStatus::Restarting {
                state.status = WatchdogStatus::Healthy;
            }
        }
    }

    pub fn status(&self, engine: &str) -> WatchdogStatus {
        self.engines
            .lock()
            .get(engine)
            .map(|s| s.status)
            .unwrap_or(WatchdogStatus::Healthy)
    }

    pub fn is_enabled(&self, engine: &str) -> bool {
        self.status(engine) != WatchdogStatus::Disabled
    }

    /// Safety-net pass driven by a periodic tick rather than the next
    /// failure: prunes stale entries and expires due cooldowns.
    pub fn tick(&self, now: Instant) {
        let mut engines = self.engines.lock();
        for (name, state) in engines.iter_mut() {
            state.expire_cooldown_if_due(now, name);
            state.prune(self.config.window, now);
        }
    }

    pub fn disabled_event(&self, engine: &str, at: Instant) -> Option<EngineDisabledEvent> {
        if self.status(engine) == WatchdogStatus::Disabled {
            Some(EngineDisabledEvent {
                engine: engine.to_string(),
                at,
            })
        } else {
            None
        }
    }
}

/// Subscribes `watchdog` to `engine`'s failure events: every failure is
/// recorded, and a transition into `Restarting` spawns a
/// dedicated thread that closes and reinitializes the engine, publishing
/// [`EngineRecoveredEvent`] back into the same watchdog on success. Call
/// once per engine at boot, after the engine's own `initialize()`.
pub fn attach(watchdog: Arc<Watchdog>, engine: Arc<dyn SttEngine>) {
    let engine_captured = engine.clone();
    let watchdog_captured = watchdog.clone();
    engine.failure_events().subscribe(move |event: &EngineFailureEvent| {
        let status = watchdog_captured.record_failure(event);
        if status == WatchdogStatus::Restarting {
            let engine = engine_captured.clone();
            let watchdog = watchdog_captured.clone();
            let engine_name = event.engine.clone();
            let spawned = std::thread::Builder::new()
                .name("watchdog-restart".to_string())
                .spawn(move || {
                    if let Err(err) = engine.close() {
                        warn!(engine = %engine_name, %err, "watchdog-driven engine close failed");
                        return;
                    }
                    match engine.initialize() {
                        Ok(()) => {
                            info!(engine = %engine_name, "watchdog restart succeeded");
                            watchdog.record_recovery(&EngineRecoveredEvent { engine: engine_name });
                        }
                        Err(err) => {
                            warn!(engine = %engine_name, %err, "watchdog-driven engine reinitialize failed");
                        }
                    }
                });
            if let Err(err) = spawned {
                warn!(%err, "failed to spawn watchdog restart thread");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(engine: &str, at: Instant) -> EngineFailureEvent {
        EngineFailureEvent {
            engine: engine.to_string(),
            at,
            reason: "test".to_string(),
            cause: None,
            context: None,
        }
    }

    #[test]
    fn stays_healthy_under_budget() {
        let watchdog = Watchdog::new(WatchdogConfig {
            window: Duration::from_secs(60),
            max_restarts_in_window: 3,
            cooldown: Duration::from_secs(300),
        });
        let now = Instant::now();
        assert_eq!(watchdog.record_failure(&failure("primary", now)), WatchdogStatus::Restarting);
        assert_eq!(watchdog.record_failure(&failure("primary", now)), WatchdogStatus::Restarting);
        assert!(watchdog.is_enabled("primary"));
    }

    #[test]
    fn disables_after_budget_exceeded() {
        let watchdog = Watchdog::new(WatchdogConfig {
            window: Duration::from_secs(60),
            max_restarts_in_window: 2,
            cooldown: Duration::from_secs(300),
        });
        let now = Instant::now();
        watchdog.record_failure(&failure("primary", now));
        watchdog.record_failure(&failure("primary", now));
        let status = watchdog.record_failure(&failure("primary", now));
        assert_eq!(status, WatchdogStatus::Disabled);
        assert!(!watchdog.is_enabled("primary"));
    }

    #[test]
    fn disabled_engine_ignores_failures_until_cooldown_expires() {
        let watchdog = Watchdog::new(WatchdogConfig {
            window: Duration::from_secs(60),
            max_restarts_in_window: 1,
            cooldown: Duration::from_millis(50),
        });
        let now = Instant::now();
        watchdog.record_failure(&failure("primary", now));
        watchdog.record_failure(&failure("primary", now));
        assert!(!watchdog.is_enabled("primary"));

        let still_cooling = now + Duration::from_millis(10);
        watchdog.record_failure(&failure("primary", still_cooling));
        assert!(!watchdog.is_enabled("primary"));

        let after_cooldown = now + Duration::from_millis(60);
        let status = watchdog.record_failure(&failure("primary", after_cooldown));
        assert_eq!(status, WatchdogStatus::Restarting);
    }

    #[test]
    fn recovery_clears_restarting_but_keeps_window() {
        let watchdog = Watchdog::new(WatchdogConfig {
            window: Duration::from_secs(60),
            max_restarts_in_window: 5,
            cooldown: Duration::from_secs(300),
        });
        let now = Instant::now();
        watchdog.record_failure(&failure("primary", now));
        assert_eq!(watchdog.status("primary"), WatchdogStatus::Restarting);
        watchdog.record_recovery(&EngineRecoveredEvent { engine: "primary".to_string() });
        assert_eq!(watchdog.status("primary"), WatchdogStatus::Healthy);
    }

    #[test]
    fn tick_prunes_old_failures_outside_window() {
        let watchdog = Watchdog::new(WatchdogConfig {
            window: Duration::from_millis(10),
            max_restarts_in_window: 1,
            cooldown: Duration::from_secs(300),
        });
        let now = Instant::now();
        watchdog.record_failure(&failure("primary", now));
        let later = now + Duration::from_millis(50);
        watchdog.tick(later);
        let status = watchdog.record_failure(&failure("primary", later));
        assert_ne!(status, WatchdogStatus::Disabled);
    }

    #[test]
    fn tick_alone_expires_cooldown_without_a_new_failure() {
        let watchdog = Watchdog::new(WatchdogConfig {
            window: Duration::from_secs(60),
            max_restarts_in_window: 1,
            cooldown: Duration::from_millis(10),
        });
        let now = Instant::now();
        watchdog.record_failure(&failure("primary", now));
        watchdog.record_failure(&failure("primary", now));
        assert!(!watchdog.is_enabled("primary"));
        watchdog.tick(now + Duration::from_millis(20));
        assert_eq!(watchdog.status("primary"), WatchdogStatus::Restarting);
    }
}
