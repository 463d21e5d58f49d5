//! Reconciliation strategies: turn an [`EnginePair`] into a
//! single [`TranscriptionResult`]. All three strategies share the same
//! null-handling before diverging on how they pick between two present
//! results.

use std::time::SystemTime;

use crate::types::{tokenize, EnginePair, TranscriptionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredSide {
    Primary,
    Secondary,
}

pub trait Reconciler: Send + Sync {
    fn reconcile(&self, pair: &EnginePair, timestamp: SystemTime) -> TranscriptionResult;
}

fn shared_null_handling(
    pair: &EnginePair,
    timestamp: SystemTime,
) -> Option<TranscriptionResult> {
    match (&pair.primary, &pair.secondary) {
        (None, None) => Some(TranscriptionResult::reconciled(String::new(), 0.0, timestamp)),
        (Some(only), None) => Some(TranscriptionResult::reconciled(
            only.text.clone(),
            only.confidence,
            timestamp,
        )),
        (None, Some(only)) => Some(TranscriptionResult::reconciled(
            only.text.clone(),
            only.confidence,
            timestamp,
        )),
        (Some(_), Some(_)) => None,
    }
}

pub struct SimplePreferenceReconciler {
    pub primary: PreferredSide,
}

impl Reconciler for SimplePreferenceReconciler {
    fn reconcile(&self, pair: &EnginePair, timestamp: SystemTime) -> TranscriptionResult {
        if let Some(result) = shared_null_handling(pair, timestamp) {
            return result;
        }
        let (configured, other) = match self.primary {
            PreferredSide::Primary => (pair.primary.as_ref().unwrap(), pair.secondary.as_ref().unwrap()),
            PreferredSide::Secondary => (pair.secondary.as_ref().unwrap(), pair.primary.as_ref().unwrap()),
        };
        let chosen = if !configured.text.trim().is_empty() {
            configured
        } else if !other.text.trim().is_empty() {
            other
        } else {
            configured
        };
        TranscriptionResult::reconciled(chosen.text.clone(), chosen.confidence, timestamp)
    }
}

pub struct ConfidenceReconciler {
    pub primary: PreferredSide,
}

impl Reconciler for ConfidenceReconciler {
    fn reconcile(&self, pair: &EnginePair, timestamp: SystemTime) -> TranscriptionResult {
        if let Some(result) = shared_null_handling(pair, timestamp) {
            return result;
        }
        let primary = pair.primary.as_ref().unwrap();
        let secondary = pair.secondary.as_ref().unwrap();
        let chosen = if primary.confidence > secondary.confidence {
            primary
        } else if secondary.confidence > primary.confidence {
            secondary
        } else {
            // Confidence tie: prefer the side with non-blank text.
            let primary_blank = primary.text.trim().is_empty();
            let secondary_blank = secondary.text.trim().is_empty();
            if primary_blank && !secondary_blank {
                secondary
            } else if secondary_blank && !primary_blank {
                primary
            } else {
                match self.primary {
                    PreferredSide::Primary => primary,
                    PreferredSide::Secondary => secondary,
                }
            }
        };
        TranscriptionResult::reconciled(chosen.text.clone(), chosen.confidence, timestamp)
    }
}

pub struct WordOverlapReconciler {
    pub primary: PreferredSide,
    pub threshold: f32,
}

impl Reconciler for WordOverlapReconciler {
    fn reconcile(&self, pair: &EnginePair, timestamp: SystemTime) -> TranscriptionResult {
        if let Some(result) = shared_null_handling(pair, timestamp) {
            return result;
        }
        let primary = pair.primary.as_ref().unwrap();
        let secondary = pair.secondary.as_ref().unwrap();

        let a: std::collections::HashSet<String> = if primary.tokens.is_empty() {
            tokenize(&primary.text).into_iter().collect()
        } else {
            primary.tokens.iter().cloned().collect()
        };
        let b: std::collections::HashSet<String> = if secondary.tokens.is_empty() {
            tokenize(&secondary.text).into_iter().collect()
        } else {
            secondary.tokens.iter().cloned().collect()
        };
        let union: std::collections::HashSet<&String> = a.union(&b).collect();
        let union_len = union.len().max(1) as f32;
        let sim_a = a.len() as f32 / union_len;
        let sim_b = b.len() as f32 / union_len;

        let chosen = if sim_a.max(sim_b) < self.threshold {
            if primary.text.len() >= secondary.text.len() {
                primary
            } else {
                secondary
            }
        } else if sim_a > sim_b {
            primary
        } else if sim_b > sim_a {
            secondary
        } else {
            match self.primary {
                PreferredSide::Primary => primary,
                PreferredSide::Secondary => secondary,
            }
        };
        TranscriptionResult::reconciled(chosen.text.clone(), chosen.confidence, timestamp)
    }
}
