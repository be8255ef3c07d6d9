//! A loopback backend. One fixed target whose stream echoes every frame
//! back to the client. Useful for wiring checks and as the reference
//! implementation of the backend seam.

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use tracing::debug;

use webtty_core::{Result, TargetInfo, TargetLister};

use crate::ws::{SessionInfo, StreamHandler};

/// The id the echo target is published under.
pub const ECHO_TARGET_ID: &str = "echo";

#[derive(Debug, Clone, Copy, Default)]
pub struct EchoBackend;

#[async_trait]
impl TargetLister for EchoBackend {
    async fn targets(&self) -> Result<Vec<TargetInfo>> {
        Ok(vec![TargetInfo {
            id: ECHO_TARGET_ID.to_string(),
            name: "echo".to_string(),
            state: "running".to_string(),
        }])
    }
}

#[async_trait]
impl StreamHandler for EchoBackend {
    async fn handle(&self, session: SessionInfo, mut socket: WebSocket) {
        loop {
            let received = match session.idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, socket.recv()).await {
                    Ok(received) => received,
                    Err(_) => {
                        debug!(target_id = %session.target_id, "session idle, closing");
                        let _ = socket
                            .send(Message::Close(Some(CloseFrame {
                                code: axum::extract::ws::close_code::NORMAL,
                                reason: Utf8Bytes::from_static("idle timeout"),
                            })))
                            .await;
                        return;
                    }
                },
                None => socket.recv().await,
            };

            match received {
                Some(Ok(Message::Text(text))) => {
                    if socket.send(Message::Text(text)).await.is_err() {
                        return;
                    }
                }
                Some(Ok(Message::Binary(bytes))) => {
                    if socket.send(Message::Binary(bytes)).await.is_err() {
                        return;
                    }
                }
                // Ping/pong are handled by the transport.
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => return,
                Some(Err(e)) => {
                    debug!(target_id = %session.target_id, error = %e, "session stream error");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_backend_lists_single_running_target() {
        let targets = EchoBackend.targets().await.unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, ECHO_TARGET_ID);
        assert_eq!(targets[0].state, "running");
    }
}
