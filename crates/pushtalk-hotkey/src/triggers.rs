//! Hotkey trigger strategies. Each variant is a pure edge
//! detector: stateful, but owned and called from a single thread (the
//! hotkey manager's dispatch), so none of these types need interior
//! synchronization — no `AtomicBool`/`AtomicU64` debounce state, since
//! that's only needed when a callback runs on its own thread.

use crate::event::{KeyEventKind, Modifier, NormalizedKeyEvent};
use std::collections::BTreeSet;

pub trait HotkeyTrigger: Send {
    fn on_key_pressed(&mut self, evt: &NormalizedKeyEvent) -> bool;
    fn on_key_released(&mut self, evt: &NormalizedKeyEvent) -> bool;
    fn name(&self) -> &'static str;
}

/// Triggers while `target_key` is held with at least `required_modifiers`
/// down. Repeats while held are suppressed by the `held` guard.
pub struct SingleKeyTrigger {
    target_key: String,
    required_modifiers: BTreeSet<Modifier>,
    held: bool,
}

impl SingleKeyTrigger {
    pub fn new(target_key: impl Into<String>, required_modifiers: BTreeSet<Modifier>) -> Self {
        Self {
            target_key: target_key.into().to_uppercase(),
            required_modifiers,
            held: false,
        }
    }
}

impl HotkeyTrigger for SingleKeyTrigger {
    fn on_key_pressed(&mut self, evt: &NormalizedKeyEvent) -> bool {
        if evt.kind != KeyEventKind::Pressed {
            return false;
        }
        if !self.held
            && evt.key == self.target_key
            && evt.has_all_modifiers(&self.required_modifiers)
        {
            self.held = true;
            return true;
        }
        false
    }

    fn on_key_released(&mut self, evt: &NormalizedKeyEvent) -> bool {
        if evt.kind != KeyEventKind::Released {
            return false;
        }
        if self.held && evt.key == self.target_key {
            self.held = false;
            return true;
        }
        false
    }

    fn name(&self) -> &'static str {
        "single-key"
    }
}

/// Triggers on the second press of `target_key` within `threshold_ms` of
/// the first; the held state (`active`) clears on release.
pub struct DoubleTapTrigger {
    target_key: String,
    threshold_ms: u64,
    active: bool,
    last_press_ms: Option<u64>,
}

impl DoubleTapTrigger {
    pub fn new(target_key: impl Into<String>, threshold_ms: u64) -> Self {
        Self {
            target_key: target_key.into().to_uppercase(),
            threshold_ms,
            active: false,
            last_press_ms: None,
        }
    }
}

impl HotkeyTrigger for DoubleTapTrigger {
    fn on_key_pressed(&mut self, evt: &NormalizedKeyEvent) -> bool {
        if evt.kind != KeyEventKind::Pressed || evt.key != self.target_key {
            return false;
        }
        let is_double_tap = self
            .last_press_ms
            .map(|last| evt.when_ms.saturating_sub(last) <= self.threshold_ms)
            .unwrap_or(false);

        if is_double_tap {
            self.active = true;
            self.last_press_ms = None;
            return true;
        }
        self.last_press_ms = Some(evt.when_ms);
        false
    }

    fn on_key_released(&mut self, evt: &NormalizedKeyEvent) -> bool {
        if evt.kind != KeyEventKind::Released {
            return false;
        }
        if self.active {
            self.active = false;
            return true;
        }
        false
    }

    fn name(&self) -> &'static str {
        "double-tap"
    }
}

/// Triggers when every modifier in `modifiers` is down together with
/// `primary_key`. Only the primary key's release clears `held`;
/// releasing a modifier first is ignored.
pub struct ModifierComboTrigger {
    modifiers: BTreeSet<Modifier>,
    primary_key: String,
    held: bool,
}

impl ModifierComboTrigger {
    pub fn new(modifiers: BTreeSet<Modifier>, primary_key: impl Into<String>) -> Self {
        Self {
            modifiers,
            primary_key: primary_key.into().to_uppercase(),
            held: false,
        }
    }
}

impl HotkeyTrigger for ModifierComboTrigger {
    fn on_key_pressed(&mut self, evt: &NormalizedKeyEvent) -> bool {
        if evt.kind != KeyEventKind::Pressed {
            return false;
        }
        if !self.held && evt.key == self.primary_key && evt.has_all_modifiers(&self.modifiers) {
            self.held = true;
            return true;
        }
        false
    }

    fn on_key_released(&mut self, evt: &NormalizedKeyEvent) -> bool {
        if evt.kind != KeyEventKind::Released {
            return false;
        }
        if self.held && evt.key == self.primary_key {
            self.held = false;
            return true;
        }
        false
    }

    fn name(&self) -> &'static str {
        "modifier-combination"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: &str, mods: &[Modifier], when_ms: u64) -> NormalizedKeyEvent {
        NormalizedKeyEvent::new(KeyEventKind::Pressed, key, mods.iter().copied().collect(), when_ms)
    }

    fn release(key: &str, when_ms: u64) -> NormalizedKeyEvent {
        NormalizedKeyEvent::new(KeyEventKind::Released, key, BTreeSet::new(), when_ms)
    }

    #[test]
    fn single_key_triggers_once_on_press_and_once_on_release() {
        let mut trigger = SingleKeyTrigger::new("F9", BTreeSet::new());
        assert!(trigger.on_key_pressed(&press("F9", &[], 0)));
        // repeat while held is suppressed
        assert!(!trigger.on_key_pressed(&press("F9", &[], 10)));
        assert!(trigger.on_key_released(&release("F9", 20)));
        assert!(!trigger.on_key_released(&release("F9", 30)));
    }

    #[test]
    fn single_key_requires_modifiers_subset() {
        let mut mods = BTreeSet::new();
        mods.insert(Modifier::Control);
        let mut trigger = SingleKeyTrigger::new("F9", mods);
        assert!(!trigger.on_key_pressed(&press("F9", &[], 0)));
        assert!(trigger.on_key_pressed(&press("F9", &[Modifier::Control, Modifier::Shift], 0)));
    }

    #[test]
    fn double_tap_triggers_within_threshold() {
        let mut trigger = DoubleTapTrigger::new("F9", 300);
        assert!(!trigger.on_key_pressed(&press("F9", &[], 0)));
        assert!(trigger.on_key_pressed(&press("F9", &[], 300)));
        assert!(trigger.on_key_released(&release("F9", 310)));
    }

    #[test]
    fn double_tap_one_ms_over_threshold_does_not_trigger() {
        let mut trigger = DoubleTapTrigger::new("F9", 300);
        assert!(!trigger.on_key_pressed(&press("F9", &[], 0)));
        assert!(!trigger.on_key_pressed(&press("F9", &[], 301)));
    }

    #[test]
    fn modifier_combo_ignores_modifier_release_and_waits_for_primary() {
        let mut mods = BTreeSet::new();
        mods.insert(Modifier::Control);
        mods.insert(Modifier::Shift);
        let mut trigger = ModifierComboTrigger::new(mods, "D");

        assert!(trigger.on_key_pressed(&press("D", &[Modifier::Control, Modifier::Shift], 0)));
        // releasing a modifier key by itself is not the trigger's release edge
        assert!(!trigger.on_key_released(&release("CONTROL", 5)));
        assert!(trigger.on_key_released(&release("D", 10)));
    }
}
