//! Configuration module for modelsync
//!
//! Loads config from `$XDG_CONFIG_HOME/modelsync/config.toml` or `~/.config/modelsync/config.toml`.
//! Falls back to embedded defaults if file doesn't exist.
//! Partial configs are merged with defaults using serde's default attributes.
//! `OLLAMA_HOST` overrides the local server address.
//!
//! # Example
//!
//! ```no_run
//! use modelsync::config::Config;
//!
//! let config = Config::load().expect("Failed to load config");
//! println!("Registry: {}", config.registry.url);
//! println!("Local server: {}", config.local.host);
//! ```

pub mod options;
pub mod schema;

pub use options::RunOptions;
pub use schema::{Config, UpdateMethod};
