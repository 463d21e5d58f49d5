//! Process heartbeat, modeled on the audio-line [`crate::clock`] sibling
//! `WatchdogTimer` in the capture crate: a background tick that records
//! liveness and lets callers ask "are we still ticking?" without wiring
//! any component-specific checks into the foundation crate.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

pub struct HealthMonitor {
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Spawns the heartbeat task and returns a handle that aborts it on drop.
    pub fn start(self) -> HealthMonitorHandle {
        let interval = self.interval;
        let last_heartbeat = Arc::new(RwLock::new(Instant::now()));
        let heartbeat_for_task = Arc::clone(&last_heartbeat);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                *heartbeat_for_task.write() = Instant::now();
                tracing::debug!("health monitor heartbeat");
            }
        });

        HealthMonitorHandle {
            task,
            last_heartbeat,
            interval,
        }
    }
}

pub struct HealthMonitorHandle {
    task: JoinHandle<()>,
    last_heartbeat: Arc<RwLock<Instant>>,
    interval: Duration,
}

impl HealthMonitorHandle {
    /// Healthy iff a heartbeat landed within the last two ticks.
    pub fn is_healthy(&self) -> bool {
        self.last_heartbeat.read().elapsed() < self.interval * 2
    }

    pub fn last_heartbeat_age(&self) -> Duration {
        self.last_heartbeat.read().elapsed()
    }
}

impl Drop for HealthMonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
