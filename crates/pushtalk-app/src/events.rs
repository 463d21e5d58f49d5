//! Orchestrator-level event published once a capture session's transcript
//! has been produced (and, in dual-engine mode, reconciled).

use std::time::SystemTime;

use pushtalk_stt::TranscriptionResult;

#[derive(Debug, Clone)]
pub struct TranscriptionCompletedEvent {
    pub result: TranscriptionResult,
    pub timestamp: SystemTime,
    pub engine_used: String,
}
