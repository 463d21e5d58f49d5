pub mod engine;
pub mod manager;

pub use engine::SubprocessEngine;
pub use manager::{SubprocessConfig, SubprocessManager};
