pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::PommaiConfig;
pub use error::{PommaiError, Result};
pub use events::SessionEvent;
pub use types::*;
