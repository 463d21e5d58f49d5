pub mod dispatcher;
pub mod engine;
pub mod events;
pub mod inprocess;
pub mod reconciler;
pub mod subprocess;
pub mod types;
pub mod watchdog;

#[cfg(feature = "vosk")]
pub mod vosk_recognizer;

pub use dispatcher::{transcribe_both, SttExecutor};
pub use engine::{LifecycleGuard, SttEngine};
pub use events::{EngineDisabledEvent, EngineFailureEvent, EngineRecoveredEvent};
pub use inprocess::{InProcessEngine, PauseDetectionConfig, RecognizerSession, SttModel};
pub use reconciler::{
    ConfidenceReconciler, PreferredSide, Reconciler, SimplePreferenceReconciler,
    WordOverlapReconciler,
};
pub use subprocess::{SubprocessConfig, SubprocessEngine, SubprocessManager};
pub use types::{tokenize, EnginePair, EngineResult, TranscriptionResult};
pub use watchdog::{attach as attach_watchdog, Watchdog, WatchdogConfig, WatchdogStatus};

#[cfg(feature = "vosk")]
pub use vosk_recognizer::VoskModel;
