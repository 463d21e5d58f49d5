//! Layered settings tree, mirroring exactly the configuration keys the
//! application exposes. Loaded compiled-defaults -> optional
//! `config/dictation.toml` -> `DICTATION_*` environment variables (double
//! underscore nesting) -> CLI flags, using the same `config` crate already
//! pulled in by `pushtalk-foundation`. Validation is a single aggregated
//! pass rather than fail-on-first-field, per `ConfigError::aggregate`.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use pushtalk_foundation::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CaptureSettings {
    pub chunk_ms: u64,
    pub max_duration_ms: u64,
    pub device_name: Option<String>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            chunk_ms: 20,
            max_duration_ms: 60_000,
            device_name: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ValidationSettings {
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            min_duration_ms: 250,
            max_duration_ms: 300_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct AudioSettings {
    pub validation: ValidationSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HotkeyTriggerKind {
    SingleKey,
    DoubleTap,
    ModifierCombo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HotkeySettings {
    pub trigger: HotkeyTriggerKind,
    pub key: String,
    pub modifiers: Vec<String>,
    pub threshold_ms: u64,
}

impl Default for HotkeySettings {
    fn default() -> Self {
        Self {
            trigger: HotkeyTriggerKind::SingleKey,
            key: "F9".to_string(),
            modifiers: Vec::new(),
            threshold_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConcurrencySettings {
    pub primary_max: usize,
    pub secondary_max: usize,
    pub acquire_timeout_ms: u64,
}

impl Default for ConcurrencySettings {
    fn default() -> Self {
        Self {
            primary_max: 4,
            secondary_max: 2,
            acquire_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconcileStrategy {
    Simple,
    Confidence,
    Overlap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReconcileSettings {
    pub enabled: bool,
    pub strategy: ReconcileStrategy,
    pub overlap_threshold: f32,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: ReconcileStrategy::Confidence,
            overlap_threshold: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WatchdogSettings {
    pub enabled: bool,
    pub window_minutes: u64,
    pub max_restarts_per_window: usize,
    pub cooldown_minutes: u64,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            window_minutes: 60,
            max_restarts_per_window: 3,
            cooldown_minutes: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SttSettings {
    pub model_dir: PathBuf,
    pub subprocess_binary: PathBuf,
    pub subprocess_model_path: PathBuf,
    pub timeout_ms: u64,
    pub concurrency: ConcurrencySettings,
    pub reconcile: ReconcileSettings,
    pub watchdog: WatchdogSettings,
}

impl Default for SttSettings {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models/vosk"),
            subprocess_binary: PathBuf::from("whisper-cli"),
            subprocess_model_path: PathBuf::from("models/whisper.bin"),
            timeout_ms: 5000,
            concurrency: ConcurrencySettings::default(),
            reconcile: ReconcileSettings::default(),
            watchdog: WatchdogSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PasteShortcut {
    #[serde(rename = "META+V")]
    MetaV,
    #[serde(rename = "CONTROL+V")]
    ControlV,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NewlineStyleSetting {
    Lf,
    CrLf,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TypingSettings {
    pub paste_shortcut: PasteShortcut,
    pub chunk_size: usize,
    pub inter_chunk_delay_ms: u64,
    pub focus_delay_ms: u64,
    pub normalize_newlines: NewlineStyleSetting,
    pub trim_trailing_newline: bool,
    pub restore_clipboard: bool,
    pub clipboard_only_fallback: bool,
}

impl Default for TypingSettings {
    fn default() -> Self {
        Self {
            paste_shortcut: PasteShortcut::Auto,
            chunk_size: 500,
            inter_chunk_delay_ms: 30,
            focus_delay_ms: 0,
            normalize_newlines: NewlineStyleSetting::Lf,
            trim_trailing_newline: false,
            restore_clipboard: false,
            clipboard_only_fallback: true,
        }
    }
}

/// The full settings tree, `Arc`-wrapped and handed to every component
/// constructor at boot. Never mutated afterward — there is no live reload.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    #[serde(default)]
    pub capture: CaptureSettings,
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub hotkey: HotkeySettings,
    #[serde(default)]
    pub stt: SttSettings,
    #[serde(default)]
    pub typing: TypingSettings,
}

/// CLI overlay: every flag also has a matching env var via `clap`'s `env`
/// feature. Fields are `Option` so an absent flag leaves
/// the layered file/env value untouched.
#[derive(Debug, Parser)]
#[command(name = "pushtalk", author, version, about = "Push-to-talk dictation engine")]
pub struct Cli {
    /// Path to the settings TOML file (default: config/dictation.toml)
    #[arg(long, env = "DICTATION_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Named input device; falls back to the system default
    #[arg(long, env = "DICTATION_CAPTURE__DEVICE_NAME")]
    pub device_name: Option<String>,

    /// Hotkey to bind, e.g. F9
    #[arg(long, env = "DICTATION_HOTKEY__KEY")]
    pub hotkey_key: Option<String>,

    /// Disable dual-engine reconciliation and run a single engine
    #[arg(long, env = "DICTATION_STT__RECONCILE__ENABLED")]
    pub reconcile_enabled: Option<bool>,

    /// List enumerable input devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Print a metrics snapshot on SIGINT/SIGTERM before shutting down
    #[arg(long)]
    pub print_metrics_on_exit: bool,
}

impl Settings {
    /// Compiled defaults -> `config_file` (if present) -> `DICTATION_*` env
    /// vars -> CLI overlay. `config_file` defaults to `config/dictation.toml`
    /// and is silently skipped if absent.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let config_path = cli
            .config_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("config/dictation.toml"));

        let defaults = Settings::default();
        let defaults_value = config::Config::try_from(&defaults)
            .map_err(ConfigError::Parse)?;

        let mut builder = Config::builder().add_source(defaults_value);
        if config_path.exists() {
            builder = builder.add_source(File::new(
                config_path.to_string_lossy().as_ref(),
                FileFormat::Toml,
            ));
        }
        builder = builder.add_source(
            Environment::with_prefix("DICTATION")
                .separator("__")
                .try_parsing(true),
        );

        let built = builder.build().map_err(ConfigError::Parse)?;
        let mut settings: Settings = built.try_deserialize().map_err(ConfigError::Parse)?;

        if let Some(device) = &cli.device_name {
            settings.capture.device_name = Some(device.clone());
        }
        if let Some(key) = &cli.hotkey_key {
            settings.hotkey.key = key.clone();
        }
        if let Some(enabled) = cli.reconcile_enabled {
            settings.stt.reconcile.enabled = enabled;
        }

        Ok(settings)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.stt.concurrency.acquire_timeout_ms)
    }

    pub fn dispatch_deadline(&self) -> Duration {
        Duration::from_millis(self.stt.timeout_ms)
    }

    pub fn watchdog_config(&self) -> pushtalk_stt::WatchdogConfig {
        pushtalk_stt::WatchdogConfig {
            window: Duration::from_secs(self.stt.watchdog.window_minutes * 60),
            max_restarts_in_window: self.stt.watchdog.max_restarts_per_window,
            cooldown: Duration::from_secs(self.stt.watchdog.cooldown_minutes * 60),
        }
    }

    /// Aggregates every validation failure into a single `ConfigError`
    /// rather than stopping at the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut issues = Vec::new();

        if self.audio.validation.min_duration_ms >= self.audio.validation.max_duration_ms {
            issues.push(ConfigError::Validation {
                field: "audio.validation.min-duration-ms".to_string(),
                reason: "must be less than audio.validation.max-duration-ms".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.stt.reconcile.overlap_threshold) {
            issues.push(ConfigError::Validation {
                field: "stt.reconcile.overlap-threshold".to_string(),
                reason: "must be in [0,1]".to_string(),
            });
        }
        if self.stt.concurrency.primary_max == 0 {
            issues.push(ConfigError::Validation {
                field: "stt.concurrency.primary-max".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.hotkey.trigger == HotkeyTriggerKind::DoubleTap && self.hotkey.threshold_ms == 0 {
            issues.push(ConfigError::Validation {
                field: "hotkey.threshold-ms".to_string(),
                reason: "must be nonzero for DOUBLE_TAP trigger".to_string(),
            });
        }
        if self.typing.chunk_size == 0 {
            issues.push(ConfigError::Validation {
                field: "typing.chunk-size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        match ConfigError::aggregate(issues) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn min_duration_not_less_than_max_is_rejected() {
        let mut settings = Settings::default();
        settings.audio.validation.min_duration_ms = settings.audio.validation.max_duration_ms;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("min-duration-ms"));
    }

    #[test]
    fn out_of_range_overlap_threshold_is_rejected() {
        let mut settings = Settings::default();
        settings.stt.reconcile.overlap_threshold = 1.5;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("overlap-threshold"));
    }

    #[test]
    fn multiple_bad_fields_are_aggregated_together() {
        let mut settings = Settings::default();
        settings.stt.reconcile.overlap_threshold = 2.0;
        settings.stt.concurrency.primary_max = 0;
        let msg = settings.validate().unwrap_err().to_string();
        assert!(msg.contains("overlap-threshold"));
        assert!(msg.contains("primary-max"));
    }

    #[test]
    fn double_tap_trigger_requires_nonzero_threshold() {
        let mut settings = Settings::default();
        settings.hotkey.trigger = HotkeyTriggerKind::DoubleTap;
        settings.hotkey.threshold_ms = 0;
        assert!(settings.validate().is_err());
    }
}
