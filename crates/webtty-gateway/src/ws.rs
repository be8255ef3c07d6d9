//! The upgrade endpoint: turns an ordinary request into a live session.
//!
//! Validation (origin rule, subprotocol negotiation) happens before the
//! upgrade; everything after the upgrade is the backend's business. The
//! gateway's only obligation past this point is the open/close pairing on
//! the session counter, which the RAII guard discharges on every exit path.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{
        Path, State,
        ws::{WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::server::AppState;

/// Subprotocol tokens the gateway advertises during upgrade negotiation.
pub const SUPPORTED_PROTOCOLS: &[&str] = &["webtty"];

/// Everything a backend needs to know about one session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Opaque target identifier from the URL, passed through unchanged.
    pub target_id: String,
    /// Close the session after this long without activity. `None` = never.
    /// Enforcing this is the stream handler's job, not the orchestrator's.
    pub idle_timeout: Option<Duration>,
}

/// Handles the body of one upgraded session.
///
/// The handler owns the socket until the session ends, however it ends.
/// Failures stay local to the session: they are logged, never surfaced to
/// the lifecycle orchestrator.
#[async_trait]
pub trait StreamHandler: Send + Sync + 'static {
    async fn handle(&self, session: SessionInfo, socket: WebSocket);
}

// The upgrade extractor is taken as a Result so origin and subprotocol
// problems are reported on their own terms even when the request is not
// actually upgradable.
pub(crate) async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if let Some(ref pattern) = state.origin {
        let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
        match origin {
            Some(o) if pattern.is_match(o) => {}
            _ => {
                debug!(target = %id, ?origin, "rejecting upgrade: origin not allowed");
                return StatusCode::FORBIDDEN.into_response();
            }
        }
    }

    if !offers_supported_protocol(&headers) {
        debug!(target = %id, "rejecting upgrade: no supported subprotocol offered");
        return (StatusCode::BAD_REQUEST, "unsupported websocket subprotocol").into_response();
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let session = SessionInfo {
        target_id: id,
        idle_timeout: state.idle_timeout,
    };
    let counter = state.counter.clone();
    let backend = Arc::clone(&state.backend);

    ws.protocols(SUPPORTED_PROTOCOLS.iter().copied())
        .on_upgrade(move |socket| async move {
            let _guard = counter.open();
            debug!(target = %session.target_id, "session opened");
            let target = session.target_id.clone();
            backend.handle(session, socket).await;
            debug!(target = %target, "session closed");
        })
}

/// True when the peer's `Sec-WebSocket-Protocol` offer intersects
/// [`SUPPORTED_PROTOCOLS`].
fn offers_supported_protocol(headers: &HeaderMap) -> bool {
    headers
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
        .map(|offered| {
            offered
                .split(',')
                .map(str::trim)
                .any(|p| SUPPORTED_PROTOCOLS.contains(&p))
        })
        .unwrap_or(false)
}
