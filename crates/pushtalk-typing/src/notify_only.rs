//! Notify-only adapter: the terminal tier of the chain. Never touches the
//! clipboard or synthesizes keystrokes — only logs a non-PII notification
//! (character count, truncated preview), following the same redaction
//! discipline as the rest of the application's logging: redact raw
//! transcribed text at `info`, allow only character count and a truncated
//! preview at `debug`.

use tracing::{debug, info};

use crate::adapter::TypingAdapter;

const PREVIEW_CHARS: usize = 120;

fn truncated_preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        text.to_string()
    } else {
        let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
        preview.push('\u{2026}');
        preview
    }
}

pub struct NotifyOnlyAdapter;

impl Default for NotifyOnlyAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyOnlyAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl TypingAdapter for NotifyOnlyAdapter {
    fn tier_name(&self) -> &'static str {
        "notify-only"
    }

    fn can_deliver(&self) -> bool {
        true
    }

    /// Always reports success — this is the end of the chain, and retrying
    /// it would just log the same notification again.
    fn deliver(&self, text: &str) -> Result<bool, String> {
        info!(chars = text.chars().count(), "transcription delivery fell back to notify-only");
        debug!(preview = %truncated_preview(text), "notify-only preview");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_passes_short_text_through_unchanged() {
        assert_eq!(truncated_preview("hello"), "hello");
    }

    #[test]
    fn preview_truncates_long_text_at_120_chars() {
        let text = "a".repeat(200);
        let preview = truncated_preview(&text);
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 1);
        assert!(preview.ends_with('\u{2026}'));
    }

    #[test]
    fn deliver_always_succeeds() {
        let adapter = NotifyOnlyAdapter::new();
        assert!(adapter.can_deliver());
        assert_eq!(adapter.deliver("anything").unwrap(), true);
    }
}
