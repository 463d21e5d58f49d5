//! Dual-sink logging: human-readable output on stderr plus a
//! daily-rotated file under `logs/`, both driven by the same `EnvFilter`
//! (default `info`). Full transcript text is never logged at `info` —
//! only its character count; a truncated preview is allowed at `debug`.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Longest transcript preview permitted at `debug`.
pub const TRANSCRIPT_PREVIEW_CHARS: usize = 120;

/// Truncates a transcript to a safe preview length for `debug` logging.
/// Callers must never pass the full transcript at `info` or above.
pub fn transcript_preview(text: &str) -> String {
    if text.chars().count() <= TRANSCRIPT_PREVIEW_CHARS {
        text.to_string()
    } else {
        let mut preview: String = text.chars().take(TRANSCRIPT_PREVIEW_CHARS).collect();
        preview.push('\u{2026}');
        preview
    }
}

/// Installs the stderr + rotating-file dual sink. The returned `WorkerGuard`
/// must be held for the lifetime of the process — dropping it flushes and
/// stops the non-blocking file writer.
pub fn init(log_dir: &Path) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "dictation.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Deletes rotated log files older than `retention_days`. `None` defaults to
/// 7 days; `Some(0)` disables pruning entirely.
pub fn prune_old_logs(log_dir: &Path, retention_days: Option<u64>) {
    let retention_days = retention_days.unwrap_or(7);
    if retention_days == 0 {
        return;
    }

    let cutoff = match std::time::SystemTime::now()
        .checked_sub(std::time::Duration::from_secs(retention_days * 24 * 60 * 60))
    {
        Some(cutoff) => cutoff,
        None => return,
    };

    let entries = match std::fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with("dictation.log.") {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };
        if modified < cutoff {
            let _ = std::fs::remove_file(entry.path());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_transcript_is_unchanged() {
        assert_eq!(transcript_preview("hello world"), "hello world");
    }

    #[test]
    fn long_transcript_is_truncated_with_ellipsis() {
        let text = "a".repeat(200);
        let preview = transcript_preview(&text);
        assert_eq!(preview.chars().count(), TRANSCRIPT_PREVIEW_CHARS + 1);
        assert!(preview.ends_with('\u{2026}'));
    }

    #[test]
    fn pruning_respects_zero_disable() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("dictation.log.2020-01-01");
        std::fs::write(&stale, b"old").unwrap();
        prune_old_logs(dir.path(), Some(0));
        assert!(stale.exists());
    }
}
