pub mod event;
pub mod key_hook;
pub mod manager;
pub mod triggers;

pub use event::{KeyEventKind, Modifier, NormalizedKeyEvent};
pub use manager::{HotkeyManager, HotkeyPressedEvent, HotkeyReleasedEvent};
pub use triggers::{DoubleTapTrigger, HotkeyTrigger, ModifierComboTrigger, SingleKeyTrigger};
