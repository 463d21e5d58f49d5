//! Shared adapter interface for the three delivery tiers. A synchronous
//! call shape, since none of them ever block on an async runtime.

pub trait TypingAdapter: Send + Sync {
    fn tier_name(&self) -> &'static str;

    /// Cheap, non-blocking check — no side effects.
    fn can_deliver(&self) -> bool;

    /// Attempts delivery. `Ok(true)` is success, `Ok(false)` means the
    /// adapter declined without error (falls through to the next tier),
    /// `Err` means it attempted and failed.
    fn deliver(&self, text: &str) -> Result<bool, String>;
}
