use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use pushtalk_app::settings::{Cli, HotkeyTriggerKind, Settings};
use pushtalk_app::{preflight, Orchestrator};
use pushtalk_audio::{AudioCaptureService, CaptureConfig, DeviceManager};
use pushtalk_foundation::{AppState, ConcurrencyGuard, HealthMonitor, ShutdownHandler, StateManager};
use pushtalk_hotkey::event::Modifier;
use pushtalk_hotkey::triggers::{DoubleTapTrigger, ModifierComboTrigger, SingleKeyTrigger};
use pushtalk_hotkey::{key_hook, HotkeyManager, HotkeyTrigger};
use pushtalk_stt::{InProcessEngine, PauseDetectionConfig, SttEngine, SttExecutor, SubprocessConfig, SubprocessEngine, Watchdog};
use pushtalk_telemetry::Metrics;
use pushtalk_typing::{ClipboardOnlyAdapter, ClipboardOnlyConfig, NewlineStyle, NotifyOnlyAdapter, SyntheticPasteAdapter, SyntheticPasteConfig, TypingAdapter, TypingChain};

fn parse_modifier(name: &str) -> Option<Modifier> {
    match name.to_uppercase().as_str() {
        "SHIFT" => Some(Modifier::Shift),
        "CONTROL" | "CTRL" => Some(Modifier::Control),
        "ALT" => Some(Modifier::Alt),
        "META" | "SUPER" | "WIN" => Some(Modifier::Meta),
        _ => None,
    }
}

fn build_trigger(settings: &Settings) -> Box<dyn HotkeyTrigger> {
    let modifiers: BTreeSet<Modifier> = settings
        .hotkey
        .modifiers
        .iter()
        .filter_map(|m| parse_modifier(m))
        .collect();

    match settings.hotkey.trigger {
        HotkeyTriggerKind::SingleKey => {
            Box::new(SingleKeyTrigger::new(settings.hotkey.key.clone(), modifiers))
        }
        HotkeyTriggerKind::DoubleTap => Box::new(DoubleTapTrigger::new(
            settings.hotkey.key.clone(),
            settings.hotkey.threshold_ms,
        )),
        HotkeyTriggerKind::ModifierCombo => {
            Box::new(ModifierComboTrigger::new(modifiers, settings.hotkey.key.clone()))
        }
    }
}

fn build_typing_chain(settings: &Settings) -> Arc<TypingChain> {
    let mut tiers: Vec<Box<dyn TypingAdapter>> = Vec::new();

    let synthetic_config = SyntheticPasteConfig {
        chunk_size: settings.typing.chunk_size,
        inter_chunk_delay: Duration::from_millis(settings.typing.inter_chunk_delay_ms),
        ..Default::default()
    };
    match SyntheticPasteAdapter::new(synthetic_config) {
        Ok(adapter) => tiers.push(Box::new(adapter)),
        Err(err) => tracing::warn!(%err, "synthetic-paste adapter unavailable"),
    }

    let newline_style = match settings.typing.normalize_newlines {
        pushtalk_app::settings::NewlineStyleSetting::Lf => NewlineStyle::Lf,
        pushtalk_app::settings::NewlineStyleSetting::CrLf => NewlineStyle::CrLf,
        pushtalk_app::settings::NewlineStyleSetting::None => NewlineStyle::None,
    };
    if settings.typing.clipboard_only_fallback {
        let clipboard_config = ClipboardOnlyConfig {
            newline_style,
            strip_trailing_newlines: settings.typing.trim_trailing_newline,
            restore_previous: settings.typing.restore_clipboard,
            ..Default::default()
        };
        match ClipboardOnlyAdapter::new(clipboard_config) {
            Ok(adapter) => tiers.push(Box::new(adapter)),
            Err(err) => tracing::warn!(%err, "clipboard-only adapter unavailable"),
        }
    }

    tiers.push(Box::new(NotifyOnlyAdapter::new()));

    Arc::new(TypingChain::new(tiers))
}

fn build_stt_engines(
    settings: &Settings,
) -> (Option<Arc<dyn SttEngine>>, Option<Arc<dyn SttEngine>>) {
    let primary_concurrency =
        ConcurrencyGuard::new("primary", settings.stt.concurrency.primary_max);
    let acquire_timeout = settings.acquire_timeout();

    #[cfg(feature = "vosk")]
    let primary: Option<Arc<dyn SttEngine>> = {
        let model_dir = settings.stt.model_dir.clone();
        let sample_rate = pushtalk_audio::format::SAMPLE_RATE_HZ as f32;
        let factory = move || {
            pushtalk_stt::VoskModel::load(&model_dir.to_string_lossy(), sample_rate)
        };
        Some(Arc::new(InProcessEngine::new(
            "vosk",
            primary_concurrency,
            PauseDetectionConfig::default(),
            acquire_timeout,
            factory,
        )))
    };
    #[cfg(not(feature = "vosk"))]
    let primary: Option<Arc<dyn SttEngine>> = {
        let _ = primary_concurrency;
        None
    };

    let secondary_concurrency =
        ConcurrencyGuard::new("whisper-cli", settings.stt.concurrency.secondary_max);
    let mut subprocess_config =
        SubprocessConfig::new(settings.stt.subprocess_binary.clone(), settings.stt.subprocess_model_path.clone());
    subprocess_config.timeout = settings.dispatch_deadline();
    let secondary: Option<Arc<dyn SttEngine>> = Some(Arc::new(SubprocessEngine::new(
        "whisper-cli",
        subprocess_config,
        secondary_concurrency,
        acquire_timeout,
    )));

    (primary, secondary)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = std::path::PathBuf::from("logs");
    let _log_guard = pushtalk_app::logging::init(&log_dir)?;
    let retention_days = std::env::var("DICTATION_LOG_RETENTION_DAYS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok());
    pushtalk_app::logging::prune_old_logs(&log_dir, retention_days);
    tracing::info!("starting push-to-talk dictation engine");

    let cli = Cli::parse();

    if cli.list_devices {
        let devices = DeviceManager::new();
        println!("Input devices:");
        for name in devices.enumerate_input_names() {
            println!("- {name}");
        }
        return Ok(());
    }

    let settings = Arc::new(Settings::load(&cli).unwrap_or_else(|err| {
        tracing::error!(%err, "failed to load settings, falling back to defaults");
        Settings::default()
    }));

    if let Err(err) = settings.validate() {
        tracing::error!(%err, "settings failed validation");
        return Err(err.into());
    }

    if let Err(issues) = preflight::run(&settings) {
        for issue in &issues {
            tracing::error!(message = %issue.message, "preflight issue");
        }
        return Err(format!("{} preflight issue(s) found", issues.len()).into());
    }

    let state_manager = StateManager::new();
    let _health_monitor = HealthMonitor::new(Duration::from_secs(10)).start();
    let shutdown = ShutdownHandler::new().install().await;

    state_manager.transition(AppState::Running)?;
    tracing::info!("application state: Running");

    let metrics = Arc::new(Metrics::default());

    let capture_service = Arc::new(AudioCaptureService::new(
        settings.capture.device_name.clone(),
        CaptureConfig {
            chunk_ms: settings.capture.chunk_ms,
            max_duration_ms: settings.capture.max_duration_ms,
            ..Default::default()
        },
    ));

    let executor = Arc::new(SttExecutor::new());
    let (primary_engine, secondary_engine) = build_stt_engines(&settings);

    if let Some(engine) = &primary_engine {
        engine.initialize()?;
    }
    if let Some(engine) = &secondary_engine {
        engine.initialize()?;
    }

    let watchdog = Arc::new(if settings.stt.watchdog.enabled {
        Watchdog::new(settings.watchdog_config()).with_metrics(metrics.clone())
    } else {
        // A restart budget no session will ever exhaust: disabling the
        // watchdog means "never flip an engine to DISABLED", not skipping
        // construction, since the orchestrator always consults `is_enabled`.
        Watchdog::new(pushtalk_stt::WatchdogConfig {
            window: Duration::from_secs(60 * 60 * 24 * 365),
            max_restarts_in_window: usize::MAX,
            cooldown: Duration::from_secs(1),
        })
    });

    if let Some(engine) = &primary_engine {
        pushtalk_stt::attach_watchdog(watchdog.clone(), engine.clone());
    }
    if let Some(engine) = &secondary_engine {
        pushtalk_stt::attach_watchdog(watchdog.clone(), engine.clone());
    }

    let typing_chain = build_typing_chain(&settings);

    let orchestrator = Orchestrator::new(
        settings.clone(),
        capture_service.clone(),
        executor,
        primary_engine.clone(),
        secondary_engine.clone(),
        watchdog,
        typing_chain,
        metrics.clone(),
    );

    let trigger = build_trigger(&settings);
    let hotkey_manager = HotkeyManager::new(trigger);
    orchestrator.attach(&hotkey_manager, capture_service.error_events());
    let hotkey_manager = Arc::new(std::sync::Mutex::new(hotkey_manager));
    let _key_hook = key_hook::spawn(hotkey_manager);

    let mut stats_interval = tokio::time::interval(Duration::from_secs(30));
    tokio::select! {
        _ = shutdown.wait() => {
            tracing::debug!("shutdown signal received");
        }
        _ = async {
            loop {
                stats_interval.tick().await;
                tracing::info!(snapshot = %metrics.snapshot(), "periodic metrics snapshot");
            }
        } => {}
    }

    tracing::debug!("beginning graceful shutdown");
    orchestrator.begin_shutdown();
    state_manager.transition(AppState::Stopping)?;
    capture_service.shutdown();
    state_manager.transition(AppState::Stopped)?;
    tracing::debug!("shutdown complete");

    Ok(())
}
