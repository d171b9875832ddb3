pub mod config;
pub mod logging;

pub use config::{DEFAULT_API_KEY_ENV, DeckConfig};
