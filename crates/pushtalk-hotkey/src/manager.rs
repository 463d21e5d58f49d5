//! Hotkey manager: forwards normalized key events to the
//! configured trigger and publishes press/release edges on a pair of
//! allocation-free [`pushtalk_foundation::Publisher`]s.

use crate::event::NormalizedKeyEvent;
use crate::triggers::HotkeyTrigger;
use pushtalk_foundation::Publisher;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct HotkeyPressedEvent {
    pub at: Instant,
}

#[derive(Debug, Clone, Copy)]
pub struct HotkeyReleasedEvent {
    pub at: Instant,
}

pub struct HotkeyManager {
    trigger: Box<dyn HotkeyTrigger>,
    pressed: Publisher<HotkeyPressedEvent>,
    released: Publisher<HotkeyReleasedEvent>,
}

impl HotkeyManager {
    pub fn new(trigger: Box<dyn HotkeyTrigger>) -> Self {
        Self {
            trigger,
            pressed: Publisher::new(),
            released: Publisher::new(),
        }
    }

    pub fn on_pressed(&self, handler: impl Fn(&HotkeyPressedEvent) + Send + Sync + 'static) {
        self.pressed.subscribe(handler);
    }

    pub fn on_released(&self, handler: impl Fn(&HotkeyReleasedEvent) + Send + Sync + 'static) {
        self.released.subscribe(handler);
    }

    /// Called once per `NormalizedKeyEvent` from the key-hook adapter.
    pub fn handle_event(&mut self, evt: &NormalizedKeyEvent) {
        use crate::event::KeyEventKind;
        let triggered = match evt.kind {
            KeyEventKind::Pressed => self.trigger.on_key_pressed(evt),
            KeyEventKind::Released => self.trigger.on_key_released(evt),
        };
        if !triggered {
            return;
        }
        match evt.kind {
            KeyEventKind::Pressed => self.pressed.publish(&HotkeyPressedEvent { at: Instant::now() }),
            KeyEventKind::Released => self.released.publish(&HotkeyReleasedEvent { at: Instant::now() }),
        }
    }

    pub fn trigger_name(&self) -> &'static str {
        self.trigger.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{KeyEventKind, Modifier, NormalizedKeyEvent};
    use crate::triggers::SingleKeyTrigger;
    use parking_lot::Mutex;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    #[test]
    fn press_and_release_publish_exactly_one_event_each() {
        let trigger = SingleKeyTrigger::new("F9", BTreeSet::new());
        let mut manager = HotkeyManager::new(Box::new(trigger));

        let presses = Arc::new(Mutex::new(0));
        let releases = Arc::new(Mutex::new(0));
        let p = presses.clone();
        manager.on_pressed(move |_| *p.lock() += 1);
        let r = releases.clone();
        manager.on_released(move |_| *r.lock() += 1);

        manager.handle_event(&NormalizedKeyEvent::new(
            KeyEventKind::Pressed,
            "F9",
            BTreeSet::new(),
            0,
        ));
        // repeat while held: no additional event
        manager.handle_event(&NormalizedKeyEvent::new(
            KeyEventKind::Pressed,
            "F9",
            BTreeSet::new(),
            5,
        ));
        manager.handle_event(&NormalizedKeyEvent::new(
            KeyEventKind::Released,
            "F9",
            BTreeSet::new(),
            10,
        ));

        assert_eq!(*presses.lock(), 1);
        assert_eq!(*releases.lock(), 1);
    }

    #[test]
    fn unrelated_keys_publish_nothing() {
        let trigger = SingleKeyTrigger::new("F9", BTreeSet::new());
        let mut manager = HotkeyManager::new(Box::new(trigger));
        let presses = Arc::new(Mutex::new(0));
        let p = presses.clone();
        manager.on_pressed(move |_| *p.lock() += 1);

        manager.handle_event(&NormalizedKeyEvent::new(
            KeyEventKind::Pressed,
            "A",
            BTreeSet::new(),
            0,
        ));
        assert_eq!(*presses.lock(), 0);
    }
}
