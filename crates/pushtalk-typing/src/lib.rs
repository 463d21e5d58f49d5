//! Ordered text-delivery adapter chain: synthesized paste,
//! clipboard-only, then a notify-only terminal tier.

pub mod adapter;
pub mod chain;
pub mod clipboard_only;
pub mod events;
pub mod notify_only;
pub mod synthetic_paste;

pub use adapter::TypingAdapter;
pub use chain::TypingChain;
pub use clipboard_only::{ClipboardOnlyAdapter, ClipboardOnlyConfig, NewlineStyle};
pub use events::{AllTypingFallbacksFailedEvent, TypingFallbackEvent};
pub use notify_only::NotifyOnlyAdapter;
pub use synthetic_paste::{SyntheticPasteAdapter, SyntheticPasteConfig};
