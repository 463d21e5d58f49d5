//! Integration tests for the foundation crate: clock abstraction and the
//! error taxonomy shared across capture, STT, and config.

use pushtalk_foundation::clock::{real_clock, test_clock, Clock, RealClock, TestClock};
use pushtalk_foundation::error::{AudioError, ConfigError, DictationError, SttError};
use std::time::{Duration, Instant};

// ─── RealClock Tests ────────────────────────────────────────────────

#[test]
fn real_clock_now_returns_current_time() {
    let clock = RealClock::new();
    let before = Instant::now();
    let clock_time = clock.now();
    let after = Instant::now();
    assert!(clock_time >= before);
    assert!(clock_time <= after);
}

#[test]
fn real_clock_factory_function() {
    let clock = real_clock();
    let t = clock.now();
    assert!(t.elapsed() < Duration::from_secs(1));
}

// ─── TestClock Tests ────────────────────────────────────────────────

#[test]
fn test_clock_starts_at_current_time() {
    let before = Instant::now();
    let clock = TestClock::new();
    let clock_time = clock.now();
    assert!(clock_time.duration_since(before) < Duration::from_millis(100));
}

#[test]
fn test_clock_advance() {
    let clock = TestClock::new();
    let t0 = clock.now();
    clock.advance(Duration::from_secs(5));
    let t1 = clock.now();
    assert_eq!(t1.duration_since(t0), Duration::from_secs(5));
}

#[test]
fn test_clock_advance_accumulates() {
    let clock = TestClock::new();
    let start = clock.now();
    clock.advance(Duration::from_millis(100));
    clock.advance(Duration::from_millis(200));
    clock.advance(Duration::from_millis(300));
    let elapsed = clock.now().duration_since(start);
    assert_eq!(elapsed, Duration::from_millis(600));
}

#[test]
fn test_clock_sleep_advances_time() {
    let clock = TestClock::new();
    let t0 = clock.now();
    clock.sleep(Duration::from_secs(10));
    let t1 = clock.now();
    assert_eq!(t1.duration_since(t0), Duration::from_secs(10));
}

#[test]
fn test_clock_set_time() {
    let clock = TestClock::new();
    let target = Instant::now() + Duration::from_secs(1000);
    clock.set_time(target);
    assert_eq!(clock.now(), target);
}

#[test]
fn test_clock_factory_function() {
    let clock = test_clock();
    let t = clock.now();
    clock.sleep(Duration::from_secs(1));
    let t2 = clock.now();
    assert_eq!(t2.duration_since(t), Duration::from_secs(1));
}

// ─── Error Type Tests ───────────────────────────────────────────────

#[test]
fn audio_error_device_not_found() {
    let err = AudioError::DeviceNotFound {
        name: Some("test_mic".to_string()),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("test_mic"));
}

#[test]
fn audio_error_buffer_overflow() {
    let err = AudioError::BufferOverflow { count: 512 };
    let msg = format!("{}", err);
    assert!(msg.contains("512"));
}

#[test]
fn audio_error_invalid_audio_carries_reason() {
    let err = AudioError::InvalidAudio {
        reason: "TOO_SHORT".to_string(),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("TOO_SHORT"));
}

#[test]
fn audio_error_capture_state_violations() {
    assert!(format!("{}", AudioError::AlreadyActive).contains("already active"));
    assert!(format!("{}", AudioError::StillActive).contains("still active"));
    assert!(format!("{}", AudioError::Canceled).contains("canceled"));
}

#[test]
fn stt_error_transcription_failed() {
    let err = SttError::TranscriptionFailed("timeout".to_string());
    let msg = format!("{}", err);
    assert!(msg.contains("timeout"));
}

#[test]
fn stt_error_non_zero_exit_includes_stderr_snippet() {
    let err = SttError::NonZeroExit {
        code: Some(1),
        stderr_snippet: "model load failed".to_string(),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("model load failed"));
}

#[test]
fn stt_error_parse_error_is_recoverable_locally() {
    let err = SttError::ParseError("unexpected token".to_string());
    assert!(matches!(err, SttError::ParseError(_)));
}

#[test]
fn dictation_error_from_audio_error() {
    let audio_err = AudioError::DeviceDisconnected;
    let err: DictationError = audio_err.into();
    assert!(matches!(err, DictationError::Audio(_)));
}

#[test]
fn dictation_error_from_stt_error() {
    let stt_err = SttError::TranscriptionFailed("test".to_string());
    let err: DictationError = stt_err.into();
    assert!(matches!(err, DictationError::Stt(_)));
}

#[test]
fn dictation_error_shutdown() {
    let err = DictationError::ShutdownRequested;
    let msg = format!("{}", err);
    assert!(msg.contains("shutdown"));
}

#[test]
fn dictation_error_fatal() {
    let err = DictationError::Fatal("critical failure".to_string());
    let msg = format!("{}", err);
    assert!(msg.contains("critical failure"));
}

#[test]
fn config_error_validation() {
    let err = ConfigError::Validation {
        field: "stt.timeout-ms".to_string(),
        reason: "must be positive".to_string(),
    };
    let msg = format!("{}", err);
    assert!(msg.contains("stt.timeout-ms"));
}

#[test]
fn config_error_aggregate_collapses_single_issue() {
    let issues = vec![ConfigError::MissingField("hotkey.key".to_string())];
    let agg = ConfigError::aggregate(issues).unwrap();
    assert!(format!("{}", agg).contains("hotkey.key"));
}
