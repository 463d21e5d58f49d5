//! The ordered typing chain itself: walks
//! `{synthetic-paste, clipboard-only, notify-only}` in order, stopping at the
//! first adapter whose `can_deliver()` is true and whose `deliver()` returns
//! `Ok(true)`. Each attempt emits its own event regardless of outcome, so a
//! fallthrough to the next tier is always visible after the fact.

use std::time::Instant;

use tracing::warn;

use pushtalk_foundation::Publisher;

use crate::adapter::TypingAdapter;
use crate::events::{AllTypingFallbacksFailedEvent, TypingFallbackEvent};

pub struct TypingChain {
    tiers: Vec<Box<dyn TypingAdapter>>,
    on_fallback: Publisher<TypingFallbackEvent>,
    on_all_failed: Publisher<AllTypingFallbacksFailedEvent>,
}

impl TypingChain {
    pub fn new(tiers: Vec<Box<dyn TypingAdapter>>) -> Self {
        Self {
            tiers,
            on_fallback: Publisher::new(),
            on_all_failed: Publisher::new(),
        }
    }

    pub fn on_fallback(&self) -> &Publisher<TypingFallbackEvent> {
        &self.on_fallback
    }

    pub fn on_all_failed(&self) -> &Publisher<AllTypingFallbacksFailedEvent> {
        &self.on_all_failed
    }

    /// Delivers `text` through the chain, returning the name of the tier
    /// that succeeded, or `None` if every tier was skipped or failed.
    pub fn deliver(&self, text: &str) -> Option<&'static str> {
        for tier in &self.tiers {
            if !tier.can_deliver() {
                self.on_fallback.publish(&TypingFallbackEvent {
                    tier: tier.tier_name().to_string(),
                    reason: "cannot-deliver".to_string(),
                    at: Instant::now(),
                });
                continue;
            }
            match tier.deliver(text) {
                Ok(true) => return Some(tier.tier_name()),
                Ok(false) => {
                    self.on_fallback.publish(&TypingFallbackEvent {
                        tier: tier.tier_name().to_string(),
                        reason: "declined".to_string(),
                        at: Instant::now(),
                    });
                }
                Err(reason) => {
                    warn!(tier = tier.tier_name(), %reason, "typing tier failed");
                    self.on_fallback.publish(&TypingFallbackEvent {
                        tier: tier.tier_name().to_string(),
                        reason,
                        at: Instant::now(),
                    });
                }
            }
        }
        self.on_all_failed.publish(&AllTypingFallbacksFailedEvent {
            reason: "all typing tiers exhausted".to_string(),
            at: Instant::now(),
        });
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct StubAdapter {
        name: &'static str,
        can_deliver: bool,
        result: Result<bool, String>,
    }

    impl TypingAdapter for StubAdapter {
        fn tier_name(&self) -> &'static str {
            self.name
        }
        fn can_deliver(&self) -> bool {
            self.can_deliver
        }
        fn deliver(&self, _text: &str) -> Result<bool, String> {
            self.result.clone()
        }
    }

    #[test]
    fn stops_at_first_tier_that_succeeds() {
        let chain = TypingChain::new(vec![
            Box::new(StubAdapter {
                name: "synthetic-paste",
                can_deliver: true,
                result: Ok(true),
            }),
            Box::new(StubAdapter {
                name: "clipboard-only",
                can_deliver: true,
                result: Ok(true),
            }),
        ]);
        assert_eq!(chain.deliver("hello"), Some("synthetic-paste"));
    }

    #[test]
    fn skips_tiers_that_cannot_deliver() {
        let chain = TypingChain::new(vec![
            Box::new(StubAdapter {
                name: "synthetic-paste",
                can_deliver: false,
                result: Ok(true),
            }),
            Box::new(StubAdapter {
                name: "clipboard-only",
                can_deliver: true,
                result: Ok(true),
            }),
        ]);
        assert_eq!(chain.deliver("hello"), Some("clipboard-only"));
    }

    #[test]
    fn falls_through_on_failure_and_emits_fallback_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let chain = TypingChain::new(vec![
            Box::new(StubAdapter {
                name: "synthetic-paste",
                can_deliver: true,
                result: Err("no accessibility".to_string()),
            }),
            Box::new(StubAdapter {
                name: "notify-only",
                can_deliver: true,
                result: Ok(true),
            }),
        ]);
        let events_clone = events.clone();
        chain
            .on_fallback()
            .subscribe(move |e: &TypingFallbackEvent| events_clone.lock().push(e.tier.clone()));
        assert_eq!(chain.deliver("hello"), Some("notify-only"));
        assert_eq!(*events.lock(), vec!["synthetic-paste".to_string()]);
    }

    #[test]
    fn emits_all_failed_event_when_every_tier_declines() {
        let failed = Arc::new(Mutex::new(false));
        let chain = TypingChain::new(vec![Box::new(StubAdapter {
            name: "synthetic-paste",
            can_deliver: false,
            result: Ok(true),
        })]);
        let failed_clone = failed.clone();
        chain
            .on_all_failed()
            .subscribe(move |_: &AllTypingFallbacksFailedEvent| *failed_clone.lock() = true);
        assert_eq!(chain.deliver("hello"), None);
        assert!(*failed.lock());
    }
}
