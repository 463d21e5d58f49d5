//! Core data model shared by both engines, the dispatcher, and the
//! reconciler.

use std::time::SystemTime;

/// One engine's output, including tokens for reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineResult {
    pub text: String,
    pub confidence: f32,
    pub tokens: Vec<String>,
    pub duration_ms: u32,
    pub engine_name: String,
    pub raw_json: Option<String>,
}

impl EngineResult {
    pub fn empty(engine_name: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            confidence: 1.0,
            tokens: Vec::new(),
            duration_ms: 0,
            engine_name: engine_name.into(),
            raw_json: None,
        }
    }
}

/// The merged result handed to the typing chain. `engine_name` is
/// `"reconciled"` exactly when reconciliation produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    pub text: String,
    pub confidence: f32,
    pub engine_name: String,
    pub timestamp: SystemTime,
}

impl TranscriptionResult {
    pub fn from_engine_result(result: &EngineResult, timestamp: SystemTime) -> Self {
        Self {
            text: result.text.clone(),
            confidence: result.confidence,
            engine_name: result.engine_name.clone(),
            timestamp,
        }
    }

    pub fn reconciled(text: String, confidence: f32, timestamp: SystemTime) -> Self {
        Self {
            text,
            confidence,
            engine_name: "reconciled".to_string(),
            timestamp,
        }
    }
}

/// Output of a successful parallel dispatch; at least one field is `Some`.
#[derive(Debug, Clone, Default)]
pub struct EnginePair {
    pub primary: Option<EngineResult>,
    pub secondary: Option<EngineResult>,
}

/// Tokenizes text on non-alphanumeric boundaries, lowercased — used both
/// by the subprocess engine (when no word list is present in the JSON) and
/// by the word-overlap reconciler.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_splits_on_punctuation_and_lowercases() {
        assert_eq!(
            tokenize("Hello, World! It's great."),
            vec!["hello", "world", "it", "s", "great"]
        );
    }

    #[test]
    fn tokenize_empty_string_yields_no_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ...  ").is_empty());
    }
}
