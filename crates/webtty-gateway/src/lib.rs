//! # webtty-gateway
//!
//! HTTP/WebSocket gateway for the webtty terminal service. Provides:
//!
//! - A listing page and per-target index pages
//! - The WebSocket upgrade endpoint that turns requests into sessions
//! - Session counting with a blocking drain at shutdown
//! - A lifecycle orchestrator with graceful and immediate shutdown paths
//!
//! The terminal protocol itself lives behind [`StreamHandler`]: once a
//! request is upgraded, the live socket is handed to the backend and the
//! gateway only tracks that the session exists.

mod assets;
pub mod counter;
pub mod echo;
pub mod server;
pub mod ws;

pub use counter::{SessionCounter, SessionGuard};
pub use echo::EchoBackend;
pub use server::{BoundServer, Server, ShutdownSignals, build_router};
pub use ws::{SUPPORTED_PROTOCOLS, SessionInfo, StreamHandler};

use webtty_core::TargetLister;

/// Everything the gateway needs from its backend: listing targets for the
/// index page, and handling the stream of each upgraded session.
pub trait Backend: TargetLister + StreamHandler {}

impl<T: TargetLister + StreamHandler> Backend for T {}
