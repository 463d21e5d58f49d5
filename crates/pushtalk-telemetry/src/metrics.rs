//! Process-wide counters: a flat bag of `Arc<Atomic*>` fields updated from
//! any thread, with no registry/exporter wiring — a caller reads a
//! [`MetricsSnapshot`] out and hands it to whatever exporter
//! it likes).

use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared across the capture worker, both STT engines, the watchdog, and
/// the typing chain. Cloning is cheap (every field is an `Arc`).
#[derive(Clone)]
pub struct Metrics {
    pub sessions_started: Arc<AtomicU64>,
    pub sessions_completed: Arc<AtomicU64>,
    pub sessions_canceled: Arc<AtomicU64>,
    pub sessions_failed: Arc<AtomicU64>,

    pub primary_attempts: Arc<AtomicU64>,
    pub primary_failures: Arc<AtomicU64>,
    pub secondary_attempts: Arc<AtomicU64>,
    pub secondary_failures: Arc<AtomicU64>,

    pub watchdog_restarts: Arc<AtomicU64>,
    pub watchdog_disables: Arc<AtomicU64>,

    pub typing_synthetic_paste: Arc<AtomicU64>,
    pub typing_clipboard_only: Arc<AtomicU64>,
    pub typing_notify_only: Arc<AtomicU64>,
    pub typing_all_failed: Arc<AtomicU64>,

    end_to_end_ms_total: Arc<AtomicU64>,
    end_to_end_count: Arc<AtomicU64>,
    last_latency: Arc<RwLock<Option<Duration>>>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            sessions_started: Arc::new(AtomicU64::new(0)),
            sessions_completed: Arc::new(AtomicU64::new(0)),
            sessions_canceled: Arc::new(AtomicU64::new(0)),
            sessions_failed: Arc::new(AtomicU64::new(0)),

            primary_attempts: Arc::new(AtomicU64::new(0)),
            primary_failures: Arc::new(AtomicU64::new(0)),
            secondary_attempts: Arc::new(AtomicU64::new(0)),
            secondary_failures: Arc::new(AtomicU64::new(0)),

            watchdog_restarts: Arc::new(AtomicU64::new(0)),
            watchdog_disables: Arc::new(AtomicU64::new(0)),

            typing_synthetic_paste: Arc::new(AtomicU64::new(0)),
            typing_clipboard_only: Arc::new(AtomicU64::new(0)),
            typing_notify_only: Arc::new(AtomicU64::new(0)),
            typing_all_failed: Arc::new(AtomicU64::new(0)),

            end_to_end_ms_total: Arc::new(AtomicU64::new(0)),
            end_to_end_count: Arc::new(AtomicU64::new(0)),
            last_latency: Arc::new(RwLock::new(None)),
        }
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_session_start(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_canceled(&self) {
        self.sessions_canceled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_failed(&self) {
        self.sessions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Called once a `TranscriptionCompletedEvent` has been published, with
    /// the wall-clock time measured from `HotkeyReleasedEvent`.
    pub fn record_session_completed(&self, latency: Duration) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
        self.end_to_end_ms_total
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
        self.end_to_end_count.fetch_add(1, Ordering::Relaxed);
        *self.last_latency.write() = Some(latency);
    }

    pub fn record_engine_attempt(&self, primary: bool) {
        if primary {
            self.primary_attempts.fetch_add(1, Ordering::Relaxed);
        } else {
            self.secondary_attempts.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_engine_failure(&self, primary: bool) {
        if primary {
            self.primary_failures.fetch_add(1, Ordering::Relaxed);
        } else {
            self.secondary_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_watchdog_restart(&self) {
        self.watchdog_restarts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_watchdog_disable(&self) {
        self.watchdog_disables.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_typing_tier(&self, tier: &str) {
        match tier {
            "synthetic-paste" => self.typing_synthetic_paste.fetch_add(1, Ordering::Relaxed),
            "clipboard-only" => self.typing_clipboard_only.fetch_add(1, Ordering::Relaxed),
            "notify-only" => self.typing_notify_only.fetch_add(1, Ordering::Relaxed),
            _ => 0,
        };
    }

    pub fn record_typing_all_failed(&self) {
        self.typing_all_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let count = self.end_to_end_count.load(Ordering::Relaxed);
        let total = self.end_to_end_ms_total.load(Ordering::Relaxed);
        MetricsSnapshot {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            sessions_canceled: self.sessions_canceled.load(Ordering::Relaxed),
            sessions_failed: self.sessions_failed.load(Ordering::Relaxed),
            primary_attempts: self.primary_attempts.load(Ordering::Relaxed),
            primary_failures: self.primary_failures.load(Ordering::Relaxed),
            secondary_attempts: self.secondary_attempts.load(Ordering::Relaxed),
            secondary_failures: self.secondary_failures.load(Ordering::Relaxed),
            watchdog_restarts: self.watchdog_restarts.load(Ordering::Relaxed),
            watchdog_disables: self.watchdog_disables.load(Ordering::Relaxed),
            typing_synthetic_paste: self.typing_synthetic_paste.load(Ordering::Relaxed),
            typing_clipboard_only: self.typing_clipboard_only.load(Ordering::Relaxed),
            typing_notify_only: self.typing_notify_only.load(Ordering::Relaxed),
            typing_all_failed: self.typing_all_failed.load(Ordering::Relaxed),
            avg_end_to_end_ms: if count == 0 { 0.0 } else { total as f64 / count as f64 },
            last_end_to_end: *self.last_latency.read(),
        }
    }
}

/// A point-in-time read of [`Metrics`], cheap to pass around and print.
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub sessions_started: u64,
    pub sessions_completed: u64,
    pub sessions_canceled: u64,
    pub sessions_failed: u64,
    pub primary_attempts: u64,
    pub primary_failures: u64,
    pub secondary_attempts: u64,
    pub secondary_failures: u64,
    pub watchdog_restarts: u64,
    pub watchdog_disables: u64,
    pub typing_synthetic_paste: u64,
    pub typing_clipboard_only: u64,
    pub typing_notify_only: u64,
    pub typing_all_failed: u64,
    pub avg_end_to_end_ms: f64,
    pub last_end_to_end: Option<Duration>,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sessions(started={}, completed={}, canceled={}, failed={}) \
             engines(primary={}/{} secondary={}/{}) \
             watchdog(restarts={}, disables={}) \
             typing(paste={}, clipboard={}, notify={}, all_failed={}) \
             avg_latency_ms={:.1}",
            self.sessions_started,
            self.sessions_completed,
            self.sessions_canceled,
            self.sessions_failed,
            self.primary_attempts,
            self.primary_failures,
            self.secondary_attempts,
            self.secondary_failures,
            self.watchdog_restarts,
            self.watchdog_disables,
            self.typing_synthetic_paste,
            self.typing_clipboard_only,
            self.typing_notify_only,
            self.typing_all_failed,
            self.avg_end_to_end_ms,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let m = Metrics::new();
        m.record_session_start();
        m.record_session_completed(Duration::from_millis(250));
        m.record_engine_attempt(true);
        m.record_engine_failure(true);
        m.record_watchdog_restart();
        m.record_typing_tier("clipboard-only");

        let snap = m.snapshot();
        assert_eq!(snap.sessions_started, 1);
        assert_eq!(snap.sessions_completed, 1);
        assert_eq!(snap.primary_attempts, 1);
        assert_eq!(snap.primary_failures, 1);
        assert_eq!(snap.watchdog_restarts, 1);
        assert_eq!(snap.typing_clipboard_only, 1);
        assert!((snap.avg_end_to_end_ms - 250.0).abs() < f64::EPSILON);
        assert_eq!(snap.last_end_to_end, Some(Duration::from_millis(250)));
    }

    #[test]
    fn average_latency_across_multiple_sessions() {
        let m = Metrics::new();
        m.record_session_completed(Duration::from_millis(100));
        m.record_session_completed(Duration::from_millis(300));
        let snap = m.snapshot();
        assert!((snap.avg_end_to_end_ms - 200.0).abs() < f64::EPSILON);
    }
}
