//! Events the typing chain publishes as it walks its tiers.

use std::time::Instant;

#[derive(Debug, Clone)]
pub struct TypingFallbackEvent {
    pub tier: String,
    pub reason: String,
    pub at: Instant,
}

#[derive(Debug, Clone)]
pub struct AllTypingFallbacksFailedEvent {
    pub reason: String,
    pub at: Instant,
}
