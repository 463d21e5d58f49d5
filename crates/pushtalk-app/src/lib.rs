pub mod events;
pub mod logging;
pub mod orchestrator;
pub mod preflight;
pub mod settings;

pub use events::TranscriptionCompletedEvent;
pub use orchestrator::Orchestrator;
pub use settings::{Cli, Settings};
