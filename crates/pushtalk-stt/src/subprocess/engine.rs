//! Subprocess STT engine: wraps PCM as a WAV temp file, invokes
//! the configured binary through [`SubprocessManager`], and parses the
//! `{"text", "segments":[{"text","words":[{"word"}]}]}` shape into an
//! [`EngineResult`].

use std::io::Write;
use std::time::Instant;

use pushtalk_audio::format::wrap_wav;
use pushtalk_foundation::events::Publisher;
use pushtalk_foundation::{ConcurrencyGuard, SttError};
use serde::Deserialize;
use tracing::warn;

use crate::engine::{publish_failure, SttEngine};
use crate::events::EngineFailureEvent;
use crate::subprocess::manager::{SubprocessConfig, SubprocessManager};
use crate::types::{tokenize, EngineResult};

pub struct SubprocessEngine {
    name: String,
    config: SubprocessConfig,
    manager: SubprocessManager,
    concurrency: ConcurrencyGuard,
    acquire_timeout: std::time::Duration,
    failure_events: Publisher<EngineFailureEvent>,
}

impl SubprocessEngine {
    pub fn new(
        name: impl Into<String>,
        config: SubprocessConfig,
        concurrency: ConcurrencyGuard,
        acquire_timeout: std::time::Duration,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            manager: SubprocessManager::new(),
            concurrency,
            acquire_timeout,
            failure_events: Publisher::new(),
        }
    }
}

impl SttEngine for SubprocessEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&self) -> Result<(), SttError> {
        if !self.config.binary.exists() {
            warn!(binary = %self.config.binary.display(), "subprocess STT binary not found at initialize time");
        }
        Ok(())
    }

    fn close(&self) -> Result<(), SttError> {
        Ok(())
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

impl SubprocessEngine {
    fn transcribe_inner(&self, pcm: &[u8]) -> Result<EngineResult, SttError> {
        if pcm.is_empty() {
            return Err(SttError::TranscriptionFailed("empty pcm buffer".to_string()));
        }
        let _permit = self.concurrency.acquire(self.acquire_timeout)?;

        let started = Instant::now();
        let wav = wrap_wav(pcm);
        let temp = tempfile::Builder::new()
            .prefix("pushtalk-stt-")
            .suffix(".wav")
            .tempfile()
            .map_err(|_| SttError::TranscriptionFailed("failed to create temp wav file".to_string()))?;
        temp.as_file()
            .write_all(&wav)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|_| SttError::TranscriptionFailed("failed to create temp wav file".to_string()))?;

        let raw = self.manager.transcribe(temp.path(), &self.config)?;
        let parsed = parse_subprocess_json(&raw);

        Ok(EngineResult {
            text: parsed.text,
            confidence: 1.0,
            tokens: parsed.tokens,
            duration_ms: started.elapsed().as_millis() as u32,
            engine_name: self.name.clone(),
            raw_json: Some(raw),
        })
    }
}

#[derive(Deserialize)]
struct Word {
    word: String,
}

#[derive(Deserialize)]
struct Segment {
    text: Option<String>,
    words: Option<Vec<Word>>,
}

#[derive(Deserialize)]
struct SubprocessResponse {
    text: Option<String>,
    segments: Option<Vec<Segment>>,
}

struct ParsedSubprocess {
    text: String,
    tokens: Vec<String>,
}

fn parse_subprocess_json(raw: &str) -> ParsedSubprocess {
    let response: SubprocessResponse = match serde_json::from_str(raw) {
        Ok(r) => r,
        Err(_) => {
            warn!("failed to parse subprocess STT JSON, returning empty result");
            return ParsedSubprocess {
                text: String::new(),
                tokens: Vec::new(),
            };
        }
    };

    let text = match response.text.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => response
            .segments
            .as_ref()
            .map(|segs| {
                segs.iter()
                    .filter_map(|s| s.text.as_deref().map(str::trim))
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default(),
    };

    let words_from_segments: Vec<String> = response
        .segments
        .as_ref()
        .map(|segs| {
            segs.iter()
                .flat_map(|s| s.words.iter().flatten())
                .map(|w| w.word.to_lowercase())
                .collect()
        })
        .unwrap_or_default();

    let tokens = if !words_from_segments.is_empty() {
        words_from_segments
    } else {
        tokenize(&text)
    };

    ParsedSubprocess { text, tokens }
}
