use thiserror::Error;

/// Unified error type for the webtty gateway.
#[derive(Error, Debug)]
pub enum WebttyError {
    // ── Startup errors ─────────────────────────────────────────
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    // ── Run-time errors ────────────────────────────────────────
    #[error("listener failed: {0}")]
    Listener(String),

    /// The run was cut short by the caller's immediate-cancellation signal.
    #[error("canceled")]
    Canceled,

    // ── Shutdown errors ────────────────────────────────────────
    //
    // A staged shutdown that fails is unrecoverable: the accept loop is in
    // an unknown state and no further requests can be served safely. These
    // are returned to the owner of the process lifetime rather than killing
    // the process from inside the gateway; see `is_fatal`.
    #[error("graceful shutdown failed: {0}")]
    GracefulShutdown(String),

    #[error("graceful shutdown timed out after {0} seconds")]
    GracefulTimeout(u64),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    #[error("config validation failed: {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    // ── Backend errors ─────────────────────────────────────────
    #[error("backend error: {0}")]
    Backend(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl WebttyError {
    /// Whether this error means the service is beyond recovery and the
    /// process owner should terminate rather than retry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WebttyError::GracefulShutdown(_) | WebttyError::GracefulTimeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, WebttyError>;
