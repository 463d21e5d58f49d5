//! Clipboard-only adapter: sets the clipboard and nothing else — no
//! synthesized keystrokes. Follows a save-then-restore pattern so the
//! previous clipboard contents can be put back afterward.

use std::time::Duration;

use parking_lot::Mutex;

use crate::adapter::TypingAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewlineStyle {
    Lf,
    CrLf,
    None,
}

#[derive(Debug, Clone, Copy)]
pub struct ClipboardOnlyConfig {
    pub newline_style: NewlineStyle,
    pub strip_trailing_newlines: bool,
    pub restore_previous: bool,
    /// Grace period before restoring prior clipboard contents, giving the
    /// user a window to paste the delivered text manually.
    pub restore_delay: Duration,
}

impl Default for ClipboardOnlyConfig {
    fn default() -> Self {
        Self {
            newline_style: NewlineStyle::Lf,
            strip_trailing_newlines: false,
            restore_previous: false,
            restore_delay: Duration::from_secs(30),
        }
    }
}

pub struct ClipboardOnlyAdapter {
    config: ClipboardOnlyConfig,
    clipboard: Mutex<arboard::Clipboard>,
}

impl ClipboardOnlyAdapter {
    pub fn new(config: ClipboardOnlyConfig) -> Result<Self, String> {
        let clipboard = arboard::Clipboard::new().map_err(|e| e.to_string())?;
        Ok(Self {
            config,
            clipboard: Mutex::new(clipboard),
        })
    }
}

fn normalize(text: &str, config: &ClipboardOnlyConfig) -> String {
    let mut normalized = match config.newline_style {
        NewlineStyle::Lf => text.replace("\r\n", "\n"),
        NewlineStyle::CrLf => text.replace("\r\n", "\n").replace('\n', "\r\n"),
        NewlineStyle::None => text.replace("\r\n", "").replace('\n', ""),
    };
    if config.strip_trailing_newlines {
        while normalized.ends_with('\n') || normalized.ends_with('\r') {
            normalized.pop();
        }
    }
    normalized
}

impl TypingAdapter for ClipboardOnlyAdapter {
    fn tier_name(&self) -> &'static str {
        "clipboard-only"
    }

    fn can_deliver(&self) -> bool {
        true
    }

    fn deliver(&self, text: &str) -> Result<bool, String> {
        let normalized = normalize(text, &self.config);
        let mut clipboard = self.clipboard.lock();

        let previous = if self.config.restore_previous {
            clipboard.get_text().ok()
        } else {
            None
        };

        clipboard.set_text(normalized).map_err(|e| e.to_string())?;
        drop(clipboard);

        if let Some(previous) = previous {
            let delay = self.config.restore_delay;
            std::thread::spawn(move || {
                std::thread::sleep(delay);
                if let Ok(mut clipboard) = arboard::Clipboard::new() {
                    let _ = clipboard.set_text(previous);
                }
            });
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_converts_crlf_to_lf_by_default() {
        let config = ClipboardOnlyConfig::default();
        assert_eq!(normalize("a\r\nb", &config), "a\nb");
    }

    #[test]
    fn normalize_to_crlf_converts_bare_lf() {
        let config = ClipboardOnlyConfig {
            newline_style: NewlineStyle::CrLf,
            ..ClipboardOnlyConfig::default()
        };
        assert_eq!(normalize("a\nb", &config), "a\r\nb");
    }

    #[test]
    fn normalize_none_strips_all_newlines() {
        let config = ClipboardOnlyConfig {
            newline_style: NewlineStyle::None,
            ..ClipboardOnlyConfig::default()
        };
        assert_eq!(normalize("a\r\nb\nc", &config), "abc");
    }

    #[test]
    fn strip_trailing_newlines_removes_only_the_tail() {
        let config = ClipboardOnlyConfig {
            strip_trailing_newlines: true,
            ..ClipboardOnlyConfig::default()
        };
        assert_eq!(normalize("a\nb\n\n", &config), "a\nb");
    }
}
