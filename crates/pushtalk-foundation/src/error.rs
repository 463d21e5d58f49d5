use std::time::Duration;
use thiserror::Error;

/// Top-level error type surfaced by process lifecycle components
/// (health monitor, shutdown handler, state manager, config loader).
#[derive(Error, Debug)]
pub enum DictationError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Stt(#[from] SttError),

    #[error("component failed health check: {component}")]
    HealthCheckFailed { component: String },

    #[error("shutdown requested")]
    ShutdownRequested,

    #[error("fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("transient error, will retry: {0}")]
    Transient(String),
}

impl From<std::io::Error> for DictationError {
    fn from(err: std::io::Error) -> Self {
        DictationError::Fatal(format!("io error: {err}"))
    }
}

impl From<tokio::task::JoinError> for DictationError {
    fn from(err: tokio::task::JoinError) -> Self {
        DictationError::Transient(format!("task join failed: {err}"))
    }
}

/// Errors from the capture pipeline: device access, state-machine
/// violations, and validation failures on the captured audio.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },

    #[error("device disconnected")]
    DeviceDisconnected,

    #[error("format not supported: {format}")]
    FormatNotSupported { format: String },

    #[error("buffer overflow, dropped {count} bytes")]
    BufferOverflow { count: usize },

    #[error("no audio data for {duration:?}")]
    NoDataTimeout { duration: Duration },

    #[error("permission denied acquiring audio line: {0}")]
    PermissionDenied(String),

    #[error("audio line unavailable: {0}")]
    LineUnavailable(String),

    /// `start` called while a session is already active.
    #[error("capture session already active")]
    AlreadyActive,

    /// `start`/config mutation attempted while a session has not finished draining.
    #[error("previous capture session is still active")]
    StillActive,

    /// The session was canceled before it produced a result.
    #[error("capture session canceled")]
    Canceled,

    /// Captured audio failed validation (too short, too long, or empty).
    #[error("invalid audio: {reason}")]
    InvalidAudio { reason: String },

    #[error("cpal stream error: {0}")]
    Cpal(#[from] cpal::StreamError),

    #[error("cpal build stream error: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("cpal play stream error: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("cpal supported configs error: {0}")]
    SupportedStreamConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("fatal audio error: {0}")]
    Fatal(String),
}

/// Errors from the STT engines, dispatcher, and subprocess manager.
#[derive(Debug, Error)]
pub enum SttError {
    /// Engine method invoked before initialization completed; a bug, not a runtime condition.
    #[error("engine not initialized")]
    NotInitialized,

    /// The concurrency guard refused to admit the call within its acquire timeout.
    #[error("concurrency limit reached")]
    ConcurrencyLimit,

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("subprocess exited with status {code:?}: {stderr_snippet}")]
    NonZeroExit {
        code: Option<i32>,
        stderr_snippet: String,
    },

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    /// Both engines disabled by the watchdog.
    #[error("stt unavailable: {0}")]
    Unavailable(String),

    /// Malformed recognizer JSON. Always recovered locally with empty text,
    /// never propagated past the engine boundary.
    #[error("parse error: {0}")]
    ParseError(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration parsing error: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("missing required field: {0}")]
    MissingField(String),
}

impl ConfigError {
    /// Render a list of validation failures gathered during boot as a single
    /// aggregated error, per the "report everything, not just the first bad
    /// field" requirement.
    pub fn aggregate(issues: Vec<ConfigError>) -> Option<ConfigError> {
        if issues.is_empty() {
            return None;
        }
        if issues.len() == 1 {
            return issues.into_iter().next();
        }
        let reason = issues
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Some(ConfigError::Validation {
            field: "settings".to_string(),
            reason,
        })
    }
}

#[derive(Debug, Clone)]
pub enum RecoveryStrategy {
    Retry { max_attempts: u32, delay: Duration },
    Fallback { to: String },
    Restart,
    Ignore,
    Fatal,
}

impl DictationError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            DictationError::Audio(AudioError::DeviceDisconnected) => RecoveryStrategy::Retry {
                max_attempts: 5,
                delay: Duration::from_secs(2),
            },
            DictationError::Audio(AudioError::DeviceNotFound { .. }) => {
                RecoveryStrategy::Fallback {
                    to: "default".into(),
                }
            }
            DictationError::Audio(AudioError::BufferOverflow { .. }) => RecoveryStrategy::Ignore,
            DictationError::Fatal(_) | DictationError::ShutdownRequested => {
                RecoveryStrategy::Fatal
            }
            _ => RecoveryStrategy::Restart,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_empty_is_none() {
        assert!(ConfigError::aggregate(vec![]).is_none());
    }

    #[test]
    fn aggregate_multiple_joins_reasons() {
        let issues = vec![
            ConfigError::MissingField("stt.timeout-ms".into()),
            ConfigError::Validation {
                field: "stt.reconcile.overlap-threshold".into(),
                reason: "must be in [0,1]".into(),
            },
        ];
        let agg = ConfigError::aggregate(issues).unwrap();
        let msg = agg.to_string();
        assert!(msg.contains("stt.timeout-ms"));
        assert!(msg.contains("overlap-threshold"));
    }

    #[test]
    fn device_disconnected_recovers_via_retry() {
        let err = DictationError::Audio(AudioError::DeviceDisconnected);
        assert!(matches!(
            err.recovery_strategy(),
            RecoveryStrategy::Retry { .. }
        ));
    }

    #[test]
    fn fatal_is_unrecoverable() {
        let err = DictationError::Fatal("disk full".into());
        assert!(matches!(err.recovery_strategy(), RecoveryStrategy::Fatal));
    }
}
