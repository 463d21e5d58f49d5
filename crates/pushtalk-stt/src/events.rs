//! Events flowing between the engines and the watchdog.

use std::time::Instant;

#[derive(Debug, Clone)]
pub struct EngineFailureEvent {
    pub engine: String,
    pub at: Instant,
    pub reason: String,
    pub cause: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EngineRecoveredEvent {
    pub engine: String,
}

#[derive(Debug, Clone)]
pub struct EngineDisabledEvent {
    pub engine: String,
    pub at: Instant,
}
