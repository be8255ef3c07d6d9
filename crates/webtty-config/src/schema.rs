use serde::{Deserialize, Serialize};

/// Root configuration — maps to `webtty.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebttyConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

// ── Server ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub address: String,
    /// Listen port. 0 picks an ephemeral port (useful for tests).
    pub port: u16,
    /// Optional regex matched against the `Origin` header of upgrade
    /// requests. Empty = accept any origin.
    pub ws_origin: String,
    /// Close a session after this many seconds without activity. 0 = never.
    pub idle_timeout_secs: u64,
    /// Window title for the per-target page. Supports `{target}` and
    /// `{hostname}`.
    pub title_format: String,
    /// Optional token exposed to the client via `/auth_token.js`.
    pub auth_token: Option<String>,
    /// Enable permissive CORS (for web UI development).
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".into(),
            port: 8080,
            ws_origin: String::new(),
            idle_timeout_secs: 600,
            title_format: "{target} - webtty".into(),
            auth_token: None,
            cors: false,
        }
    }
}

impl ServerConfig {
    /// The `host:port` string the listener binds to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

/// A single config validation issue.
#[derive(Debug)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let icon = match self.severity {
            WarningSeverity::Error => "error",
            WarningSeverity::Warning => "warning",
        };
        write!(f, "{}: {}: {}", icon, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, " ({})", h)?;
        }
        Ok(())
    }
}

impl WebttyConfig {
    /// Validate the config and return a list of warnings/errors.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        // ── Listen address ───
        if self.server.address.is_empty() {
            warnings.push(ConfigWarning {
                field: "server.address".into(),
                message: "listen address is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("set to e.g. '127.0.0.1'".into()),
            });
        } else if self.server.address.starts_with("0.0.0.0") {
            warnings.push(ConfigWarning {
                field: "server.address".into(),
                message: "binding to 0.0.0.0 — gateway is accessible from all interfaces".into(),
                severity: WarningSeverity::Warning,
                hint: Some("use '127.0.0.1' for local-only access, or set ws_origin".into()),
            });
        }

        // ── Origin pattern ───
        if !self.server.ws_origin.is_empty() {
            if let Err(e) = regex::Regex::new(&self.server.ws_origin) {
                warnings.push(ConfigWarning {
                    field: "server.ws_origin".into(),
                    message: format!("invalid origin pattern: {e}"),
                    severity: WarningSeverity::Error,
                    hint: Some("ws_origin must be a valid regular expression".into()),
                });
            }
        }

        // ── Title format ───
        if !self.server.title_format.contains("{target}") {
            warnings.push(ConfigWarning {
                field: "server.title_format".into(),
                message: "title format has no {target} placeholder".into(),
                severity: WarningSeverity::Warning,
                hint: Some("every target page will share the same title".into()),
            });
        }

        // ── Logging level ───
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("valid values: {}", valid_levels.join(", "))),
            });
        }

        // ── Logging format ───
        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("valid values: {}", valid_formats.join(", "))),
            });
        }

        // Check for hard errors
        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();

        if !errors.is_empty() {
            return Err(format!("configuration errors:\n  - {}", errors.join("\n  - ")));
        }

        Ok(warnings)
    }
}
