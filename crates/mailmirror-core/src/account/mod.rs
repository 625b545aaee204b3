//! Account configuration and credentials.

mod config;
mod token;

pub use config::{AccountConfig, DEFAULT_IDLE_TIMEOUT_SECS, Provider, Settings};
pub use token::{Token, load_token, save_token};
