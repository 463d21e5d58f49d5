//! Concrete [`SttModel`]/[`RecognizerSession`] pair backed by the real
//! `vosk` crate. Present only when the `vosk` feature is enabled. The
//! model is loaded once and held for the engine's lifetime; each
//! `transcribe` call builds a fresh `vosk::Recognizer` bound to it,
//! re-serializing
//! the crate's typed `CompleteResult` back into the canonical JSON shape
//! so it flows through the same `parse_recognizer_json` path a genuine
//! subprocess response would.

use pushtalk_foundation::SttError;
use vosk::{CompleteResult, Model};

use crate::inprocess::{RecognizerSession, SttModel};

pub struct VoskModel {
    model: Model,
    sample_rate: f32,
}

impl VoskModel {
    pub fn load(model_path: &str, sample_rate: f32) -> Result<std::sync::Arc<dyn SttModel>, SttError> {
        let model = Model::new(model_path)
            .ok_or_else(|| SttError::TranscriptionFailed("vosk model load failed".to_string()))?;
        Ok(std::sync::Arc::new(VoskModel { model, sample_rate }))
    }
}

impl SttModel for VoskModel {
    fn create_recognizer(&self) -> Result<Box<dyn RecognizerSession>, SttError> {
        let mut recognizer = vosk::Recognizer::new(&self.model, self.sample_rate)
            .ok_or_else(|| SttError::TranscriptionFailed("vosk recognizer create failed".to_string()))?;
        recognizer.set_words(true);
        Ok(Box::new(VoskRecognizerSession { recognizer }))
    }
}

struct VoskRecognizerSession {
    recognizer: vosk::Recognizer,
}

impl RecognizerSession for VoskRecognizerSession {
    fn recognize(&mut self, pcm: &[u8]) -> Result<String, SttError> {
        let samples: Vec<i16> = pcm
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();

        self.recognizer
            .accept_waveform(&samples)
            .map_err(|_| SttError::TranscriptionFailed("vosk accept_waveform failed".to_string()))?;
        let result = self.recognizer.final_result();
        Ok(complete_result_to_canonical_json(result))
    }
}

fn complete_result_to_canonical_json(result: CompleteResult) -> String {
    match result {
        CompleteResult::Single(single) => {
            let words: Vec<serde_json::Value> = single
                .result
                .iter()
                .map(|w| serde_json::json!({"conf": w.conf, "word": w.word}))
                .collect();
            serde_json::json!({"text": single.text, "result": words}).to_string()
        }
        CompleteResult::Multiple(multiple) => {
            let alternatives: Vec<serde_json::Value> = multiple
                .alternatives
                .iter()
                .map(|a| serde_json::json!({"text": a.text, "confidence": 1.0}))
                .collect();
            serde_json::json!({"alternatives": alternatives}).to_string()
        }
    }
}
