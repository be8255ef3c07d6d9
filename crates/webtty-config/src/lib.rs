//! # webtty-config
//!
//! Configuration system for the webtty gateway (`webtty.toml`).
//!
//! The configuration is loaded once at startup and is read-only for the
//! lifetime of the process: the listen address, origin rule, and timeouts
//! of a running gateway never change underneath it.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{LoggingConfig, ServerConfig, WebttyConfig};
