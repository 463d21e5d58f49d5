//! Wires hotkey events to the capture/STT/typing pipeline.
//! Guarantees exactly one in-flight transcription by routing every press
//! and release through the capture state machine's compare-and-swap
//! `start`/`stop`/`cancel`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use pushtalk_audio::{AudioCaptureService, AudioValidator, CaptureErrorEvent};
use pushtalk_foundation::concurrency::CaptureStateMachine;
use pushtalk_hotkey::{HotkeyManager, HotkeyPressedEvent, HotkeyReleasedEvent};
use pushtalk_stt::{
    transcribe_both, ConfidenceReconciler, PreferredSide, Reconciler, SimplePreferenceReconciler,
    SttEngine, SttError, SttExecutor, TranscriptionResult, Watchdog, WordOverlapReconciler,
};
use pushtalk_telemetry::Metrics;
use pushtalk_typing::TypingChain;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::events::TranscriptionCompletedEvent;
use crate::settings::{ReconcileStrategy, Settings};

/// Everything the orchestrator needs to drive one end-to-end session.
/// Built once at boot and shared across the lifetime of the process.
pub struct Orchestrator {
    settings: Arc<Settings>,
    capture_state: Arc<CaptureStateMachine>,
    capture_service: Arc<AudioCaptureService>,
    validator: AudioValidator,
    executor: Arc<SttExecutor>,
    primary_engine: Option<Arc<dyn SttEngine>>,
    secondary_engine: Option<Arc<dyn SttEngine>>,
    watchdog: Arc<Watchdog>,
    typing_chain: Arc<TypingChain>,
    metrics: Arc<Metrics>,
    completed: pushtalk_foundation::events::Publisher<TranscriptionCompletedEvent>,
    shutting_down: AtomicBool,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Arc<Settings>,
        capture_service: Arc<AudioCaptureService>,
        executor: Arc<SttExecutor>,
        primary_engine: Option<Arc<dyn SttEngine>>,
        secondary_engine: Option<Arc<dyn SttEngine>>,
        watchdog: Arc<Watchdog>,
        typing_chain: Arc<TypingChain>,
        metrics: Arc<Metrics>,
    ) -> Arc<Self> {
        let validator = AudioValidator::new(pushtalk_audio::ValidatorConfig {
            min_duration_ms: settings.audio.validation.min_duration_ms,
            max_duration_ms: settings.audio.validation.max_duration_ms,
        });

        Arc::new(Self {
            settings,
            capture_state: Arc::new(CaptureStateMachine::new()),
            capture_service,
            validator,
            executor,
            primary_engine,
            secondary_engine,
            watchdog,
            typing_chain,
            metrics,
            completed: pushtalk_foundation::events::Publisher::new(),
            shutting_down: AtomicBool::new(false),
        })
    }

    pub fn on_transcription_completed(
        &self,
    ) -> &pushtalk_foundation::events::Publisher<TranscriptionCompletedEvent> {
        &self.completed
    }

    /// Subscribes this orchestrator to a hotkey manager's press/release
    /// events and a capture service's error events. Call once at boot.
    pub fn attach(self: &Arc<Self>, hotkey: &HotkeyManager, capture_errors: &pushtalk_foundation::events::Publisher<CaptureErrorEvent>) {
        let press_self = Arc::clone(self);
        hotkey.on_pressed(move |_event: &HotkeyPressedEvent| {
            press_self.handle_press();
        });

        let release_self = Arc::clone(self);
        hotkey.on_released(move |_event: &HotkeyReleasedEvent| {
            release_self.handle_release();
        });

        let error_self = Arc::clone(self);
        capture_errors.subscribe(move |event: &CaptureErrorEvent| {
            error_self.handle_capture_error(event);
        });
    }

    fn handle_press(&self) {
        if self.shutting_down.load(Ordering::SeqCst) {
            return;
        }
        let candidate = Uuid::new_v4();
        if !self.capture_state.start(candidate) {
            return;
        }
        if let Err(err) = self.capture_service.start_session() {
            warn!(error = %err, "failed to start capture session after hotkey press");
            self.capture_state.cancel();
        } else {
            self.metrics.record_session_start();
        }
    }

    fn handle_release(&self) {
        let active = match self.capture_state.get_active() {
            Some(id) => id,
            None => return,
        };
        if !self.capture_state.stop(active) {
            return;
        }

        if let Err(err) = self.capture_service.stop_session(active) {
            warn!(error = %err, "failed to stop capture session");
            self.metrics.record_session_failed();
            return;
        }

        let pcm = match self.capture_service.read_all(active, &self.validator) {
            Ok(pcm) => pcm,
            Err(err) => {
                info!(error = %err, "capture session produced no usable audio");
                self.metrics.record_session_canceled();
                return;
            }
        };

        let started_at = std::time::Instant::now();
        match self.dispatch(Arc::new(pcm)) {
            Ok((result, engine_used)) => {
                self.metrics
                    .record_session_completed(started_at.elapsed());
                self.completed.publish(&TranscriptionCompletedEvent {
                    result: result.clone(),
                    timestamp: SystemTime::now(),
                    engine_used,
                });
                if self.typing_chain.deliver(&result.text).is_none() {
                    warn!("every typing tier failed to deliver the transcript");
                }
            }
            Err(err) => {
                error!(error = %err, "transcription failed");
                self.metrics.record_session_failed();
            }
        }
    }

    fn handle_capture_error(&self, event: &CaptureErrorEvent) {
        warn!(reason = ?event.reason, "capture error, cancelling active session");
        self.capture_state.cancel();
        self.metrics.record_session_canceled();
    }

    fn dispatch(&self, pcm: Arc<Vec<u8>>) -> Result<(TranscriptionResult, String), SttError> {
        if self.settings.stt.reconcile.enabled {
            self.dispatch_dual(pcm)
        } else {
            self.dispatch_single(pcm)
        }
    }

    fn dispatch_single(&self, pcm: Arc<Vec<u8>>) -> Result<(TranscriptionResult, String), SttError> {
        let engine = if self
            .primary_engine
            .as_ref()
            .map(|e| self.watchdog.is_enabled(e.name()))
            .unwrap_or(false)
        {
            self.primary_engine.clone()
        } else if self
            .secondary_engine
            .as_ref()
            .map(|e| self.watchdog.is_enabled(e.name()))
            .unwrap_or(false)
        {
            self.secondary_engine.clone()
        } else {
            None
        };

        let engine = engine.ok_or_else(|| {
            SttError::Unavailable("no STT engine is currently enabled".to_string())
        })?;

        self.metrics.record_engine_attempt(true);
        let result = engine.transcribe(&pcm)?;
        let engine_name = result.engine_name.clone();
        Ok((
            TranscriptionResult::from_engine_result(&result, SystemTime::now()),
            engine_name,
        ))
    }

    fn dispatch_dual(&self, pcm: Arc<Vec<u8>>) -> Result<(TranscriptionResult, String), SttError> {
        let deadline = self.settings.dispatch_deadline();
        let pair = transcribe_both(
            &self.executor,
            self.primary_engine.clone(),
            self.secondary_engine.clone(),
            pcm,
            deadline,
        )?;

        let reconciler = self.build_reconciler();
        let reconciled = reconciler.reconcile(&pair, SystemTime::now());
        let engine_used = reconciled.engine_name.clone();
        Ok((reconciled, engine_used))
    }

    fn build_reconciler(&self) -> Box<dyn Reconciler> {
        let primary = PreferredSide::Primary;
        match self.settings.stt.reconcile.strategy {
            ReconcileStrategy::Simple => Box::new(SimplePreferenceReconciler { primary }),
            ReconcileStrategy::Confidence => Box::new(ConfidenceReconciler { primary }),
            ReconcileStrategy::Overlap => Box::new(WordOverlapReconciler {
                primary,
                threshold: self.settings.stt.reconcile.overlap_threshold,
            }),
        }
    }

    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.capture_state.cancel();
    }
}
