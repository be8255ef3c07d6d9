//! # webtty-core
//!
//! Core types, traits, and error types for the webtty terminal gateway.
//! This crate defines the shared vocabulary used by every other crate in the workspace.

pub mod backend;
pub mod error;

pub use backend::{TargetInfo, TargetLister};
pub use error::{Result, WebttyError};
