//! Data model for a normalized key/modifier event. Produced by
//! the key-hook adapter and consumed by the hotkey manager.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Ord, PartialOrd)]
pub enum Modifier {
    Shift,
    Control,
    Alt,
    Meta,
}

/// Immutable. `key` is always uppercased; left/right meta keys are
/// distinguished (`LEFT_META`/`RIGHT_META`) when the platform exposes
/// location, otherwise the bare name is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedKeyEvent {
    pub kind: KeyEventKind,
    pub key: String,
    pub modifiers: BTreeSet<Modifier>,
    pub when_ms: u64,
}

impl NormalizedKeyEvent {
    pub fn new(
        kind: KeyEventKind,
        key: impl Into<String>,
        modifiers: BTreeSet<Modifier>,
        when_ms: u64,
    ) -> Self {
        Self {
            kind,
            key: key.into().to_uppercase(),
            modifiers,
            when_ms,
        }
    }

    pub fn has_all_modifiers(&self, required: &BTreeSet<Modifier>) -> bool {
        required.is_subset(&self.modifiers)
    }
}
