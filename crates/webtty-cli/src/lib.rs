//! # webtty-cli
//!
//! Command-line interface for the webtty gateway.
//!
//! ## Commands
//!
//! - `webtty serve` — Run the gateway until shutdown
//! - `webtty config` — Show the effective configuration
//! - `webtty version` — Show version info
//! - `webtty completions` — Generate shell completions

pub mod commands;

pub use commands::Cli;
