pub mod clock;
pub mod concurrency;
pub mod env;
pub mod error;
pub mod events;
pub mod health;
pub mod shutdown;
pub mod state;

pub use clock::*;
pub use concurrency::*;
pub use env::*;
pub use error::*;
pub use events::*;
pub use health::*;
pub use shutdown::*;
pub use state::*;
