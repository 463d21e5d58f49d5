//! Synthetic-paste adapter: places text on the clipboard, then issues the
//! OS paste chord — synthesized-keystroke mechanics for the chord itself,
//! combined with a plain clipboard write, into a single "paste, don't
//! type" tier.

use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::warn;

use crate::adapter::TypingAdapter;

#[derive(Debug, Clone, Copy)]
pub struct SyntheticPasteConfig {
    pub chunk_size: usize,
    pub inter_chunk_delay: Duration,
    pub accessibility_available: bool,
}

impl Default for SyntheticPasteConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            inter_chunk_delay: Duration::from_millis(30),
            accessibility_available: true,
        }
    }
}

pub struct SyntheticPasteAdapter {
    config: SyntheticPasteConfig,
    clipboard: Mutex<arboard::Clipboard>,
}

impl SyntheticPasteAdapter {
    pub fn new(config: SyntheticPasteConfig) -> Result<Self, String> {
        let clipboard = arboard::Clipboard::new().map_err(|e| e.to_string())?;
        Ok(Self {
            config,
            clipboard: Mutex::new(clipboard),
        })
    }

    fn paste_chord(&self) -> Result<(), String> {
        use enigo::{Enigo, Key, Keyboard, Settings};
        let mut enigo = Enigo::new(&Settings::default()).map_err(|e| e.to_string())?;
        enigo
            .key(Key::Control, enigo::Direction::Press)
            .map_err(|e| e.to_string())?;
        enigo
            .key(Key::Unicode('v'), enigo::Direction::Click)
            .map_err(|e| e.to_string())?;
        enigo
            .key(Key::Control, enigo::Direction::Release)
            .map_err(|e| e.to_string())
    }
}

impl TypingAdapter for SyntheticPasteAdapter {
    fn tier_name(&self) -> &'static str {
        "synthetic-paste"
    }

    fn can_deliver(&self) -> bool {
        self.config.accessibility_available
    }

    fn deliver(&self, text: &str) -> Result<bool, String> {
        if text.is_empty() {
            return Ok(true);
        }
        let chunks: Vec<&str> = chunk_text(text, self.config.chunk_size);
        for (i, chunk) in chunks.iter().enumerate() {
            self.clipboard
                .lock()
                .set_text(chunk.to_string())
                .map_err(|e| e.to_string())?;
            self.paste_chord()?;
            if i + 1 < chunks.len() {
                thread::sleep(self.config.inter_chunk_delay);
            }
        }
        Ok(true)
    }
}

fn chunk_text(text: &str, size: usize) -> Vec<&str> {
    if size == 0 {
        warn!("synthetic-paste chunk size is zero, delivering whole string at once");
        return vec![text];
    }
    let mut chunks = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0;
    while start < bytes.len() {
        let mut end = (start + size).min(bytes.len());
        while end < bytes.len() && !text.is_char_boundary(end) {
            end += 1;
        }
        chunks.push(&text[start..end]);
        start = end;
    }
    if chunks.is_empty() {
        chunks.push(text);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_text_splits_on_char_boundaries_within_size() {
        let chunks = chunk_text("hello world", 5);
        assert_eq!(chunks, vec!["hello", " worl", "d"]);
    }

    #[test]
    fn chunk_text_with_zero_size_returns_whole_string() {
        let chunks = chunk_text("hello", 0);
        assert_eq!(chunks, vec!["hello"]);
    }

    #[test]
    fn chunk_text_never_splits_inside_a_multibyte_character() {
        let text = "a\u{1F600}b";
        let chunks = chunk_text(text, 2);
        for chunk in &chunks {
            assert!(text.contains(chunk));
        }
        assert_eq!(chunks.concat(), text);
    }
}
