//! Key-hook adapter: a thin, swappable edge at the process
//! boundary that turns raw `rdev` events into [`NormalizedKeyEvent`]s and
//! hands them to the [`crate::manager::HotkeyManager`]. Runs its own
//! background thread matching `EventType::KeyPress`/`KeyRelease`, with no
//! mouse-button bindings or key-repeat debounce timer (the trigger
//! strategies in [`crate::triggers`] already suppress repeats).
//!
//! Modifier keys that don't reliably emit standalone press/release on every
//! platform are reconstructed by diffing the set of currently-down keys
//! against its previous state on every incoming event, synthesizing
//! `LEFT_*`/`RIGHT_*` edges where rdev exposes key location.

use crate::event::{KeyEventKind, Modifier, NormalizedKeyEvent};
use crate::manager::HotkeyManager;
use rdev::{listen, Event, EventType, Key};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn canonical_key_name(key: &Key) -> &'static str {
    match key {
        Key::ShiftLeft => "LEFT_SHIFT",
        Key::ShiftRight => "RIGHT_SHIFT",
        Key::ControlLeft => "LEFT_CONTROL",
        Key::ControlRight => "RIGHT_CONTROL",
        Key::Alt => "LEFT_ALT",
        Key::AltGr => "RIGHT_ALT",
        Key::MetaLeft => "LEFT_META",
        Key::MetaRight => "RIGHT_META",
        Key::KeyA => "A",
        Key::KeyB => "B",
        Key::KeyC => "C",
        Key::KeyD => "D",
        Key::KeyE => "E",
        Key::KeyF => "F",
        Key::KeyG => "G",
        Key::KeyH => "H",
        Key::KeyI => "I",
        Key::KeyJ => "J",
        Key::KeyK => "K",
        Key::KeyL => "L",
        Key::KeyM => "M",
        Key::KeyN => "N",
        Key::KeyO => "O",
        Key::KeyP => "P",
        Key::KeyQ => "Q",
        Key::KeyR => "R",
        Key::KeyS => "S",
        Key::KeyT => "T",
        Key::KeyU => "U",
        Key::KeyV => "V",
        Key::KeyW => "W",
        Key::KeyX => "X",
        Key::KeyY => "Y",
        Key::KeyZ => "Z",
        Key::F1 => "F1",
        Key::F2 => "F2",
        Key::F3 => "F3",
        Key::F4 => "F4",
        Key::F5 => "F5",
        Key::F6 => "F6",
        Key::F7 => "F7",
        Key::F8 => "F8",
        Key::F9 => "F9",
        Key::F10 => "F10",
        Key::F11 => "F11",
        Key::F12 => "F12",
        Key::Space => "SPACE",
        Key::Tab => "TAB",
        Key::Escape => "ESCAPE",
        _ => "UNKNOWN",
    }
}

fn modifier_for_key(key: &Key) -> Option<Modifier> {
    match key {
        Key::ShiftLeft | Key::ShiftRight => Some(Modifier::Shift),
        Key::ControlLeft | Key::ControlRight => Some(Modifier::Control),
        Key::Alt | Key::AltGr => Some(Modifier::Alt),
        Key::MetaLeft | Key::MetaRight => Some(Modifier::Meta),
        _ => None,
    }
}

struct HookState {
    down: BTreeSet<Key>,
}

impl HookState {
    fn modifiers(&self) -> BTreeSet<Modifier> {
        self.down.iter().filter_map(modifier_for_key).collect()
    }
}

/// Starts the platform listener on a dedicated background thread and feeds
/// every translated event into `manager`. The returned join handle is a
/// daemon in spirit: it runs until the process exits or the underlying
/// `rdev::listen` call returns (which it does only on a fatal platform
/// error).
pub fn spawn(manager: Arc<Mutex<HotkeyManager>>) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("key-hook".to_string())
        .spawn(move || {
            let state = Arc::new(Mutex::new(HookState {
                down: BTreeSet::new(),
            }));

            let callback = move |event: Event| {
                let (kind, key) = match event.event_type {
                    EventType::KeyPress(k) => (KeyEventKind::Pressed, k),
                    EventType::KeyRelease(k) => (KeyEventKind::Released, k),
                    _ => return,
                };

                let modifiers = {
                    let mut state = state.lock().unwrap();
                    match kind {
                        KeyEventKind::Pressed => {
                            state.down.insert(key);
                        }
                        KeyEventKind::Released => {
                            state.down.remove(&key);
                        }
                    }
                    state.modifiers()
                };

                let normalized = NormalizedKeyEvent::new(
                    kind,
                    canonical_key_name(&key),
                    modifiers,
                    now_ms(),
                );
                manager.lock().unwrap().handle_event(&normalized);
            };

            if let Err(err) = listen(callback) {
                tracing::error!(?err, "key-hook listener terminated");
            }
        })
        .expect("failed to spawn key-hook thread")
}
