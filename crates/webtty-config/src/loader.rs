use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::schema::WebttyConfig;

/// Loads the webtty configuration from disk.
///
/// The loaded config is an immutable snapshot: the gateway reads it once at
/// construction and never again.
#[derive(Debug)]
pub struct ConfigLoader {
    config: WebttyConfig,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > WEBTTY_CONFIG env > ~/.webtty/webtty.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("WEBTTY_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".webtty")
            .join("webtty.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> webtty_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            let raw = std::fs::read_to_string(&config_path)?;
            toml::from_str::<WebttyConfig>(&raw).map_err(|e| {
                webtty_core::WebttyError::Config(format!(
                    "failed to parse {}: {}",
                    config_path.display(),
                    e
                ))
            })?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            WebttyConfig::default()
        };

        // Apply environment variable overrides
        let config = Self::apply_env_overrides(config);

        // Validate config — log warnings, fail on errors
        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(webtty_core::WebttyError::Config(e));
            }
        }

        Ok(Self {
            config,
            config_path,
        })
    }

    /// The loaded configuration.
    pub fn get(&self) -> WebttyConfig {
        self.config.clone()
    }

    /// Path the config was resolved from.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Apply env var overrides (WEBTTY_ADDRESS, WEBTTY_PORT, etc.)
    fn apply_env_overrides(mut config: WebttyConfig) -> WebttyConfig {
        if let Ok(v) = std::env::var("WEBTTY_ADDRESS") {
            config.server.address = v;
        }
        if let Ok(v) = std::env::var("WEBTTY_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                config.server.port = port;
            }
        }
        if let Ok(v) = std::env::var("WEBTTY_WS_ORIGIN") {
            config.server.ws_origin = v;
        }
        if let Ok(v) = std::env::var("WEBTTY_LOG_LEVEL") {
            config.logging.level = v;
        }
        // Auth token: env var fills in when the config file doesn't set one.
        // Config file takes priority, env is the fallback.
        if config.server.auth_token.is_none() {
            if let Ok(v) = std::env::var("WEBTTY_AUTH_TOKEN") {
                config.server.auth_token = Some(v);
            }
        }
        config
    }
}
