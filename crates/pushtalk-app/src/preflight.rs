//! Boot-time validation: before the orchestrator starts
//! accepting hotkey events, check that the environment the settings
//! describe actually exists. Issues are aggregated and logged; the caller
//! decides whether any is fatal.

use std::path::Path;

use pushtalk_audio::DeviceManager;
use tracing::warn;

use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Warning,
}

#[derive(Debug, Clone)]
pub struct PreflightIssue {
    pub severity: Severity,
    pub message: String,
}

impl PreflightIssue {
    fn fatal(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Runs every check regardless of earlier failures so a single boot gives
/// the operator the complete list of problems, not just the first one.
pub fn run(settings: &Settings) -> Result<(), Vec<PreflightIssue>> {
    let mut issues = Vec::new();

    check_model_dir(settings, &mut issues);
    check_subprocess_binary(settings, &mut issues);
    check_audio_device(settings, &mut issues);
    check_numeric_consistency(settings, &mut issues);

    for issue in &issues {
        match issue.severity {
            Severity::Fatal => tracing::error!(message = %issue.message, "preflight check failed"),
            Severity::Warning => warn!(message = %issue.message, "preflight check warning"),
        }
    }

    if issues.iter().any(|i| i.severity == Severity::Fatal) {
        Err(issues)
    } else {
        Ok(())
    }
}

fn check_model_dir(settings: &Settings, issues: &mut Vec<PreflightIssue>) {
    let dir = &settings.stt.model_dir;
    if !dir.exists() {
        issues.push(PreflightIssue::fatal(format!(
            "in-process STT model directory does not exist: {}",
            dir.display()
        )));
        return;
    }
    let non_empty = std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false);
    if !non_empty {
        issues.push(PreflightIssue::fatal(format!(
            "in-process STT model directory is empty: {}",
            dir.display()
        )));
    }
}

fn check_subprocess_binary(settings: &Settings, issues: &mut Vec<PreflightIssue>) {
    let binary = &settings.stt.subprocess_binary;
    if !binary_is_executable(binary) {
        issues.push(PreflightIssue::fatal(format!(
            "subprocess STT binary not found or not executable: {}",
            binary.display()
        )));
    }
}

#[cfg(unix)]
fn binary_is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn binary_is_executable(path: &Path) -> bool {
    path.is_file()
}

fn check_audio_device(settings: &Settings, issues: &mut Vec<PreflightIssue>) {
    if let Some(name) = &settings.capture.device_name {
        let devices = DeviceManager::new();
        let names = devices.enumerate_input_names();
        if !names.iter().any(|n| n == name) {
            issues.push(PreflightIssue::fatal(format!(
                "configured input device not found: {name}"
            )));
        }
    }
}

fn check_numeric_consistency(settings: &Settings, issues: &mut Vec<PreflightIssue>) {
    if settings.audio.validation.min_duration_ms >= settings.audio.validation.max_duration_ms {
        issues.push(PreflightIssue::fatal(
            "audio.validation.min-duration-ms must be less than audio.validation.max-duration-ms"
                .to_string(),
        ));
    }
    if settings.capture.max_duration_ms < settings.audio.validation.max_duration_ms {
        issues.push(PreflightIssue::warning(
            "capture.max-duration-ms is smaller than audio.validation.max-duration-ms; the \
             validator's upper bound can never trigger"
                .to_string(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_dir_is_fatal() {
        let mut settings = Settings::default();
        settings.stt.model_dir = std::path::PathBuf::from("/nonexistent/model/dir");
        settings.stt.subprocess_binary = std::path::PathBuf::from("/bin/true");
        let result = run(&settings);
        let issues = result.unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.severity == Severity::Fatal && i.message.contains("model directory")));
    }

    #[test]
    fn missing_subprocess_binary_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("placeholder"), b"x").unwrap();
        let mut settings = Settings::default();
        settings.stt.model_dir = dir.path().to_path_buf();
        settings.stt.subprocess_binary = std::path::PathBuf::from("/nonexistent/binary");
        let issues = run(&settings).unwrap_err();
        assert!(issues.iter().any(|i| i.message.contains("subprocess STT binary")));
    }

    #[test]
    fn inconsistent_durations_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("placeholder"), b"x").unwrap();
        let mut settings = Settings::default();
        settings.stt.model_dir = dir.path().to_path_buf();
        settings.stt.subprocess_binary = std::path::PathBuf::from("/bin/true");
        settings.audio.validation.min_duration_ms = 500_000;
        let issues = run(&settings).unwrap_err();
        assert!(issues.iter().any(|i| i.message.contains("min-duration-ms")));
    }

    #[test]
    fn consistent_settings_with_real_paths_pass() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("placeholder"), b"x").unwrap();
        let mut settings = Settings::default();
        settings.stt.model_dir = dir.path().to_path_buf();
        settings.stt.subprocess_binary = std::path::PathBuf::from("/bin/true");
        settings.capture.device_name = None;
        assert!(run(&settings).is_ok());
    }
}
