//! In-process STT engine: load the model once, build a fresh recognizer
//! per call. This engine is call-and-response rather than streaming — one
//! `transcribe(pcm)` in, one [`EngineResult`] out — so the JSON it produces
//! is parsed through a standalone function that is unit-testable without a
//! real model file.

use std::time::Instant;

use parking_lot::RwLock;
use pushtalk_foundation::events::Publisher;
use pushtalk_foundation::{ConcurrencyGuard, SttError};
use serde::Deserialize;
use tracing::warn;

use crate::engine::{publish_failure, LifecycleGuard, SttEngine};
use crate::events::EngineFailureEvent;
use crate::types::{tokenize, EngineResult};

const MAX_JSON_BYTES: usize = 1024 * 1024;

/// The loaded native model, held for the engine's whole lifetime. Creating
/// a recognizer is cheap relative to loading the model, so only the model
/// is pooled; each call gets its own fresh recognizer off that model.
pub trait SttModel: Send + Sync {
    /// Builds a fresh recognizer bound to this model, for one `transcribe`
    /// call's exclusive use.
    fn create_recognizer(&self) -> Result<Box<dyn RecognizerSession>, SttError>;
}

/// A single-call native recognizer. Never reused across calls — feed the
/// whole buffer once, read the final JSON once, then drop it.
pub trait RecognizerSession: Send {
    fn recognize(&mut self, pcm: &[u8]) -> Result<String, SttError>;
}

#[derive(Debug, Clone, Copy)]
pub struct PauseDetectionConfig {
    pub silence_gap_ms: u32,
    pub window_ms: u32,
    pub rms_threshold: i64,
}

impl Default for PauseDetectionConfig {
    fn default() -> Self {
        Self {
            silence_gap_ms: 0,
            window_ms: 20,
            rms_threshold: 800,
        }
    }
}

pub struct InProcessEngine {
    name: String,
    model: RwLock<Option<std::sync::Arc<dyn SttModel>>>,
    factory: Box<dyn Fn() -> Result<std::sync::Arc<dyn SttModel>, SttError> + Send + Sync>,
    guard: LifecycleGuard,
    concurrency: ConcurrencyGuard,
    pause_detection: PauseDetectionConfig,
    acquire_timeout: std::time::Duration,
    failure_events: Publisher<EngineFailureEvent>,
}

impl InProcessEngine {
    pub fn new(
        name: impl Into<String>,
        concurrency: ConcurrencyGuard,
        pause_detection: PauseDetectionConfig,
        acquire_timeout: std::time::Duration,
        factory: impl Fn() -> Result<std::sync::Arc<dyn SttModel>, SttError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            model: RwLock::new(None),
            factory: Box::new(factory),
            guard: LifecycleGuard::new(),
            concurrency,
            pause_detection,
            acquire_timeout,
            failure_events: Publisher::new(),
        }
    }

    fn transcribe_segment(&self, pcm: &[u8]) -> Result<EngineResult, SttError> {
        let model = self
            .model
            .read()
            .clone()
            .ok_or(SttError::NotInitialized)?;
        let started = Instant::now();
        let mut recognizer = model.create_recognizer()?;
        let raw = recognizer.recognize(pcm)?;
        drop(recognizer);
        let parsed = parse_recognizer_json(&raw);
        Ok(EngineResult {
            text: parsed.text,
            confidence: parsed.confidence,
            tokens: tokenize_or(&parsed.words),
            duration_ms: started.elapsed().as_millis() as u32,
            engine_name: self.name.clone(),
            raw_json: Some(raw),
        })
    }
}

fn tokenize_or(words: &[String]) -> Vec<String> {
    if words.is_empty() {
        Vec::new()
    } else {
        words.iter().map(|w| w.to_lowercase()).collect()
    }
}

impl SttEngine for InProcessEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&self) -> Result<(), SttError> {
        self.guard.initialize(|| {
            let model = (self.factory)()?;
            *self.model.write() = Some(model);
            Ok(())
        })
    }

    fn close(&self) -> Result<(), SttError> {
        self.guard.close(|| {
            *self.model.write() = None;
            Ok(())
        })
    }

    fn transcribe(&self, pcm: &[u8]) -> Result<EngineResult, SttError> {
        let result = self.transcribe_inner(pcm);
        if let Err(err) = &result {
            publish_failure(&self.failure_events, &self.name, err);
        }
        result
    }

    fn failure_events(&self) -> &Publisher<EngineFailureEvent> {
        &self.failure_events
    }
}

impl InProcessEngine {
    fn transcribe_inner(&self, pcm: &[u8]) -> Result<EngineResult, SttError> {
        if pcm.is_empty() {
            return Err(SttError::TranscriptionFailed("empty pcm buffer".to_string()));
        }
        let _permit = self.concurrency.acquire(self.acquire_timeout)?;

        if self.pause_detection.silence_gap_ms == 0 {
            return self.transcribe_segment(pcm);
        }

        let segments = split_on_silence(pcm, self.pause_detection);
        if segments.is_empty() {
            return self.transcribe_segment(pcm);
        }

        let started = Instant::now();
        let mut texts = Vec::new();
        let mut confidences = Vec::new();
        let mut tokens = Vec::new();
        let mut raw_parts = Vec::new();
        for segment in &segments {
            let result = self.transcribe_segment(segment)?;
            if !result.text.trim().is_empty() {
                texts.push(result.text.clone());
            }
            confidences.push(result.confidence);
            tokens.extend(result.tokens);
            if let Some(raw) = result.raw_json {
                raw_parts.push(raw);
            }
        }
        let avg_confidence = if confidences.is_empty() {
            1.0
        } else {
            confidences.iter().sum::<f32>() / confidences.len() as f32
        };
        Ok(EngineResult {
            text: texts.join("\n"),
            confidence: avg_confidence,
            tokens,
            duration_ms: started.elapsed().as_millis() as u32,
            engine_name: self.name.clone(),
            raw_json: Some(format!("[{}]", raw_parts.join(","))),
        })
    }
}

/// Splits 16-bit mono PCM on RMS-silence boundaries of at least
/// `silence_gap_ms`. Returns an empty vec if no boundary is found.
fn split_on_silence(pcm: &[u8], config: PauseDetectionConfig) -> Vec<Vec<u8>> {
    let window_bytes = (config.window_ms as usize * 2 * 16_000 / 1000).max(2);
    let mut windows_rms = Vec::new();
    let mut offset = 0;
    while offset + 1 < pcm.len() {
        let end = (offset + window_bytes).min(pcm.len() - (pcm.len() - offset) % 2);
        let end = end.max(offset + 2).min(pcm.len());
        let window = &pcm[offset..end];
        windows_rms.push((offset, end, rms_i16(window)));
        offset = end;
        if end >= pcm.len() {
            break;
        }
    }

    let silent_window_count_for_gap =
        (config.silence_gap_ms as usize).div_ceil(config.window_ms.max(1) as usize);
    if silent_window_count_for_gap == 0 {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut seg_start = 0usize;
    let mut silent_run = 0usize;
    let mut found_boundary = false;
    for (start, end, rms) in &windows_rms {
        if *rms < config.rms_threshold {
            silent_run += 1;
            if silent_run == silent_window_count_for_gap {
                if *start > seg_start {
                    segments.push(pcm[seg_start..*start].to_vec());
                    found_boundary = true;
                }
                seg_start = *end;
            }
        } else {
            silent_run = 0;
        }
    }
    if seg_start < pcm.len() {
        segments.push(pcm[seg_start..].to_vec());
    }

    if found_boundary {
        segments.into_iter().filter(|s| !s.is_empty()).collect()
    } else {
        Vec::new()
    }
}

fn rms_i16(window: &[u8]) -> i64 {
    if window.len() < 2 {
        return 0;
    }
    let samples: Vec<i16> = window
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect();
    if samples.is_empty() {
        return 0;
    }
    let sum_sq: i64 = samples.iter().map(|&s| (s as i64) * (s as i64)).sum();
    ((sum_sq / samples.len() as i64) as f64).sqrt() as i64
}

#[derive(Debug, Clone, Default)]
struct ParsedResult {
    text: String,
    confidence: f32,
    words: Vec<String>,
}

#[derive(Deserialize)]
struct CanonicalWord {
    #[allow(dead_code)]
    conf: Option<f32>,
    word: Option<String>,
}

#[derive(Deserialize)]
struct CanonicalForm {
    text: Option<String>,
    result: Option<Vec<CanonicalWord>>,
}

#[derive(Deserialize)]
struct Alternative {
    text: Option<String>,
    confidence: Option<f32>,
}

#[derive(Deserialize)]
struct AlternativesForm {
    alternatives: Vec<Alternative>,
}

/// Implements the recognizer JSON contract: truncation cap, canonical vs.
/// alternatives shape, confidence clamping, and parse-error fallback.
fn parse_recognizer_json(raw: &str) -> ParsedResult {
    if raw.len() > MAX_JSON_BYTES {
        warn!(len = raw.len(), "recognizer JSON exceeds size cap, truncating");
        let mut end = MAX_JSON_BYTES;
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        return parse_recognizer_json(&raw[..end]);
    }

    if let Ok(alternatives) = serde_json::from_str::<AlternativesForm>(raw) {
        return match alternatives.alternatives.first() {
            Some(first) => ParsedResult {
                text: first.text.clone().unwrap_or_default(),
                confidence: first.confidence.unwrap_or(1.0).clamp(0.0, 1.0),
                words: Vec::new(),
            },
            None => ParsedResult {
                text: String::new(),
                confidence: 1.0,
                words: Vec::new(),
            },
        };
    }

    if let Ok(canonical) = serde_json::from_str::<CanonicalForm>(raw) {
        let text = canonical.text.unwrap_or_default().trim().to_string();
        let words: Vec<String> = canonical
            .result
            .as_ref()
            .map(|entries| entries.iter().filter_map(|w| w.word.clone()).collect())
            .unwrap_or_default();
        let confidence = match &canonical.result {
            Some(entries) if !entries.is_empty() => {
                let confs: Vec<f32> = entries.iter().filter_map(|w| w.conf).collect();
                if confs.is_empty() {
                    1.0
                } else {
                    (confs.iter().sum::<f32>() / confs.len() as f32).clamp(0.0, 1.0)
                }
            }
            _ => 1.0,
        };
        return ParsedResult {
            text,
            confidence,
            words,
        };
    }

    warn!("failed to parse recognizer JSON, falling back to empty result");
    ParsedResult {
        text: String::new(),
        confidence: 1.0,
        words: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_form_with_confidence_mean() {
        let json = r#"{"text":"hello world","result":[{"conf":0.9,"word":"hello"},{"conf":0.7,"word":"world"}]}"#;
        let parsed = parse_recognizer_json(json);
        assert_eq!(parsed.text, "hello world");
        assert!((parsed.confidence - 0.8).abs() < 1e-6);
        assert_eq!(parsed.words, vec!["hello", "world"]);
    }

    #[test]
    fn canonical_form_without_result_defaults_confidence_to_one() {
        let parsed = parse_recognizer_json(r#"{"text":"hi","result":[]}"#);
        assert_eq!(parsed.text, "hi");
        assert_eq!(parsed.confidence, 1.0);
    }

    #[test]
    fn parses_alternatives_form_taking_first_element() {
        let json = r#"{"alternatives":[{"text":"first","confidence":0.6},{"text":"second","confidence":0.9}]}"#;
        let parsed = parse_recognizer_json(json);
        assert_eq!(parsed.text, "first");
        assert!((parsed.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn empty_alternatives_yields_empty_text_and_full_confidence() {
        let parsed = parse_recognizer_json(r#"{"alternatives":[]}"#);
        assert_eq!(parsed.text, "");
        assert_eq!(parsed.confidence, 1.0);
    }

    #[test]
    fn confidence_is_clamped_to_unit_interval() {
        let json = r#"{"text":"x","result":[{"conf":1.5,"word":"x"}]}"#;
        let parsed = parse_recognizer_json(json);
        assert_eq!(parsed.confidence, 1.0);
    }

    #[test]
    fn malformed_json_falls_back_to_empty_result() {
        let parsed = parse_recognizer_json("not json at all");
        assert_eq!(parsed.text, "");
        assert_eq!(parsed.confidence, 1.0);
    }

    #[test]
    fn oversized_json_is_truncated_before_parsing() {
        let huge = format!("{{\"text\":\"{}\"", "a".repeat(MAX_JSON_BYTES + 10));
        let parsed = parse_recognizer_json(&huge);
        assert_eq!(parsed.text, "");
    }
}
