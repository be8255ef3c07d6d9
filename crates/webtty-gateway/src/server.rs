//! Gateway construction, route dispatch, and the run/shutdown lifecycle.
//!
//! The lifecycle is a three-way race: the accept loop failing, the caller's
//! immediate-cancellation token, and the caller's graceful-shutdown token.
//! Whichever fires first decides the terminal path, and every path (except
//! a bind failure, which can have no sessions) ends by draining the session
//! counter so `serve` never returns while a session is still attached.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{OriginalUri, Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use regex::Regex;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use webtty_config::WebttyConfig;
use webtty_core::{Result, WebttyError};

use crate::Backend;
use crate::assets;
use crate::counter::SessionCounter;
use crate::ws;

/// How long outstanding plain requests get to finish once a graceful
/// shutdown has been requested. Upgraded sessions are not bounded by this;
/// they run detached and are waited on by the final drain.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The two caller-supplied shutdown signals. Both are one-shot latches:
/// triggering is idempotent and the fired state can be observed any number
/// of times. The default is a pair of tokens that never fire.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignals {
    /// Stop the listener now. Already-open sessions still get to finish.
    pub immediate: CancellationToken,
    /// Stop accepting new work, let in-flight work finish, then exit.
    pub graceful: CancellationToken,
}

/// Shared state behind every route.
pub struct AppState {
    pub counter: SessionCounter,
    pub backend: Arc<dyn Backend>,
    /// Compiled origin rule for upgrade requests. `None` = accept any.
    pub origin: Option<Regex>,
    pub title_format: String,
    pub hostname: String,
    pub auth_token: Option<String>,
    pub idle_timeout: Option<Duration>,
}

/// A configured gateway, not yet bound to its address.
pub struct Server {
    listen_addr: String,
    cors: bool,
    state: Arc<AppState>,
}

impl Server {
    /// Build a gateway from config. All fallible construction happens here:
    /// an invalid origin pattern is rejected before anything binds.
    pub fn new(config: &WebttyConfig, backend: Arc<dyn Backend>) -> Result<Self> {
        let origin = if config.server.ws_origin.is_empty() {
            None
        } else {
            Some(Regex::new(&config.server.ws_origin).map_err(|e| {
                WebttyError::Config(format!("invalid ws_origin pattern: {e}"))
            })?)
        };

        let idle_timeout = (config.server.idle_timeout_secs > 0)
            .then(|| Duration::from_secs(config.server.idle_timeout_secs));

        let state = Arc::new(AppState {
            counter: SessionCounter::new(),
            backend,
            origin,
            title_format: config.server.title_format.clone(),
            hostname: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "localhost".to_string()),
            auth_token: config.server.auth_token.clone(),
            idle_timeout,
        });

        Ok(Self {
            listen_addr: config.server.listen_addr(),
            cors: config.server.cors,
            state,
        })
    }

    /// The session counter shared with the upgrade handler. Mainly a test
    /// seam; `serve` drains it before returning.
    pub fn counter(&self) -> SessionCounter {
        self.state.counter.clone()
    }

    /// The gateway router (shared between production startup and tests).
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state), self.cors)
    }

    /// Bind the configured address. Returns without touching the session
    /// counter on failure — nothing can have opened yet.
    pub async fn bind(self) -> Result<BoundServer> {
        let listener = TcpListener::bind(&self.listen_addr)
            .await
            .map_err(|source| WebttyError::Bind {
                addr: self.listen_addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "gateway listening");
        Ok(BoundServer {
            router: self.router(),
            state: self.state,
            listener,
            local_addr,
        })
    }

    /// Bind and serve until a shutdown signal or listener failure.
    pub async fn run(self, signals: ShutdownSignals) -> Result<()> {
        self.bind().await?.serve(signals).await
    }
}

/// A gateway bound to its listener, ready to serve.
pub struct BoundServer {
    router: Router,
    state: Arc<AppState>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

// Not derivable: the state holds a `dyn Backend`.
impl std::fmt::Debug for BoundServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundServer")
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl BoundServer {
    /// The actual bound address (resolves port 0 to the ephemeral port).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until one of the shutdown signals fires or the accept loop
    /// dies. Whichever terminal path is taken, this waits for every open
    /// session to close before returning.
    pub async fn serve(self, signals: ShutdownSignals) -> Result<()> {
        let BoundServer {
            router,
            state,
            listener,
            local_addr: _,
        } = self;
        let ShutdownSignals {
            immediate,
            graceful,
        } = signals;

        // The accept loop runs on its own task so this function is free to
        // sit on the control signals. The graceful token doubles as axum's
        // shutdown signal: once it fires, no new connections are accepted
        // and in-flight plain requests are allowed to complete.
        let shutdown = {
            let graceful = graceful.clone();
            async move { graceful.cancelled().await }
        };
        let mut accept: JoinHandle<std::io::Result<()>> =
            tokio::spawn(axum::serve(listener, router).with_graceful_shutdown(shutdown).into_future());

        let result = tokio::select! {
            joined = &mut accept => {
                conclude_accept_loop(joined, &graceful, &immediate)
            }
            _ = immediate.cancelled() => {
                // No staged shutdown: the listener goes away right now.
                // Upgraded sessions run as detached tasks and are not
                // severed; the drain below waits for them.
                info!("immediate shutdown requested, closing listener");
                accept.abort();
                Err(WebttyError::Canceled)
            }
            _ = graceful.cancelled() => {
                info!("graceful shutdown requested");
                match tokio::time::timeout(SHUTDOWN_GRACE, &mut accept).await {
                    Ok(joined) => conclude_accept_loop(joined, &graceful, &immediate),
                    Err(_) => {
                        // Outstanding requests did not finish inside the
                        // grace window. The accept loop is wedged; this is
                        // not retryable.
                        accept.abort();
                        Err(WebttyError::GracefulTimeout(SHUTDOWN_GRACE.as_secs()))
                    }
                }
            }
        };

        let open = state.counter.snapshot();
        if open > 0 {
            info!(open, "waiting for open sessions to close");
        }
        state.counter.drain().await;

        result
    }
}

/// Map the accept-loop task's exit to the terminal result.
///
/// A clean exit after a graceful request is the expected end of a staged
/// shutdown. Any other exit is a failure: clean-but-unrequested means the
/// loop stopped on its own, and an error after a graceful request means
/// the staged shutdown itself failed, which is unrecoverable.
fn conclude_accept_loop(
    joined: std::result::Result<std::io::Result<()>, JoinError>,
    graceful: &CancellationToken,
    immediate: &CancellationToken,
) -> Result<()> {
    match joined {
        Ok(Ok(())) if graceful.is_cancelled() => Ok(()),
        Ok(Ok(())) => {
            warn!("accept loop terminated unexpectedly");
            immediate.cancel();
            Err(WebttyError::Listener(
                "accept loop terminated unexpectedly".into(),
            ))
        }
        Ok(Err(e)) if graceful.is_cancelled() => Err(WebttyError::GracefulShutdown(e.to_string())),
        Ok(Err(e)) => {
            warn!(error = %e, "listener failed");
            immediate.cancel();
            Err(WebttyError::Listener(e.to_string()))
        }
        Err(join) if graceful.is_cancelled() => {
            Err(WebttyError::GracefulShutdown(join.to_string()))
        }
        Err(join) => {
            warn!(error = %join, "accept loop task failed");
            immediate.cancel();
            Err(WebttyError::Listener(join.to_string()))
        }
    }
}

// ── Routes ─────────────────────────────────────────────────────

/// Build the gateway router.
pub fn build_router(state: Arc<AppState>, cors: bool) -> Router {
    let router = Router::new()
        .route("/", get(list_handler))
        .route("/t/{id}", get(redirect_handler))
        .route("/t/{id}/", get(index_handler))
        .route("/t/{id}/ws", get(ws::ws_handler))
        .route("/auth_token.js", get(auth_token_handler))
        .route("/config.js", get(config_handler))
        .route("/js/{file}", get(js_asset_handler))
        .route("/css/{file}", get(css_asset_handler))
        .route("/favicon.png", get(favicon_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

// ── Handlers ───────────────────────────────────────────────────

async fn list_handler(State(state): State<Arc<AppState>>) -> Response {
    let targets = match state.backend.targets().await {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "failed to list targets");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let targets_json = match serde_json::to_string(&targets) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "failed to serialize targets");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let html = assets::render(
        &assets::template("list.html"),
        &[("title", "webtty"), ("targets_json", &targets_json)],
    );
    Html(html).into_response()
}

async fn redirect_handler(OriginalUri(uri): OriginalUri) -> Response {
    // 301 keeps relative asset and ws paths working under the trailing slash.
    // Append to the path as received so percent-encoded ids survive intact.
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(header::LOCATION, format!("{}/", uri.path()))
        .body(axum::body::Body::empty())
        .unwrap_or_else(|_| StatusCode::BAD_REQUEST.into_response())
}

async fn index_handler(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Html<String> {
    let title = state
        .title_format
        .replace("{target}", &id)
        .replace("{hostname}", &state.hostname);
    let html = assets::render(
        &assets::template("index.html"),
        &[
            ("title", &html_escape(&title)),
            ("target", &html_escape(&id)),
        ],
    );
    Html(html)
}

async fn auth_token_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = match state.auth_token {
        Some(ref token) => format!("var webtty_auth_token = \"{}\";\n", js_escape(token)),
        None => "var webtty_auth_token = null;\n".to_string(),
    };
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        body,
    )
}

async fn config_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let options = serde_json::json!({
        "protocol": crate::ws::SUPPORTED_PROTOCOLS[0],
        "idle_timeout_secs": state.idle_timeout.map(|t| t.as_secs()).unwrap_or(0),
    });
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        format!("var webtty = {options};\n"),
    )
}

async fn js_asset_handler(Path(file): Path<String>) -> Response {
    assets::asset_response(&format!("js/{file}"))
}

async fn css_asset_handler(Path(file): Path<String>) -> Response {
    assets::asset_response(&format!("css/{file}"))
}

async fn favicon_handler() -> Response {
    assets::asset_response("favicon.png")
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn js_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }

    #[test]
    fn test_js_escape() {
        assert_eq!(js_escape(r#"to"ken\x"#), r#"to\"ken\\x"#);
    }

    #[tokio::test]
    async fn test_bound_server_debug_names_local_addr() {
        let mut config = WebttyConfig::default();
        config.server.port = 0;
        let server = Server::new(&config, Arc::new(crate::echo::EchoBackend)).unwrap();
        let bound = server.bind().await.unwrap();
        let rendered = format!("{bound:?}");
        assert!(rendered.contains(&bound.local_addr().to_string()));
    }

    #[test]
    fn test_shutdown_signals_default_never_fire() {
        let signals = ShutdownSignals::default();
        assert!(!signals.graceful.is_cancelled());
        assert!(!signals.immediate.is_cancelled());
    }

    #[test]
    fn test_signals_are_one_shot_latches() {
        let signals = ShutdownSignals::default();
        signals.graceful.cancel();
        signals.graceful.cancel(); // idempotent
        assert!(signals.graceful.is_cancelled());
        assert!(!signals.immediate.is_cancelled());
    }
}
