//! Trigger service configuration.
//!
//! Worker endpoints arrive as a base64-encoded JSON map in
//! `LADLE_SERVICE_CONFIG_B64`, injected at deploy time:
//!
//! ```json
//! {
//!   "extractor":      { "url": "https://extractor.example/extract" },
//!   "cleaner":        { "url": "https://cleaner.example/clean" },
//!   "loader":         { "url": "https://loader-json.example/load" },
//!   "loader_parquet": { "url": "https://loader-parquet.example/load" }
//! }
//! ```
//!
//! A missing or undecodable blob is fatal at startup — the trigger is
//! useless without its routing targets.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use ladle_core::config::{env_bool, env_string, env_u16};

use crate::error::{Error, Result};

/// One worker endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEndpoint {
    /// Full URL the worker accepts POSTs on.
    pub url: String,
}

/// Worker endpoints by stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceUrls {
    /// The extractor's `/extract` endpoint.
    #[serde(default)]
    pub extractor: StageEndpoint,
    /// The cleaner's invocation endpoint.
    #[serde(default)]
    pub cleaner: StageEndpoint,
    /// The JSON loader's invocation endpoint (optional branch).
    #[serde(default)]
    pub loader: StageEndpoint,
    /// The Parquet loader's invocation endpoint.
    #[serde(default)]
    pub loader_parquet: StageEndpoint,
}

impl ServiceUrls {
    /// Decodes the base64-encoded JSON service map.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is not valid base64 or not valid JSON.
    pub fn from_b64(blob: &str) -> Result<Self> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(blob.trim())
            .map_err(|e| Error::Config(format!("LADLE_SERVICE_CONFIG_B64 is not base64: {e}")))?;

        serde_json::from_slice(&decoded)
            .map_err(|e| Error::Config(format!("LADLE_SERVICE_CONFIG_B64 is not valid JSON: {e}")))
    }
}

/// Configuration for the trigger service.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub http_port: u16,

    /// Enable debug mode (pretty logs, service config optional).
    pub debug: bool,

    /// Route `cleaner_completed` through the JSON loader before the
    /// Parquet loader. Off by default: the cleaner feeds the Parquet
    /// loader directly.
    pub enable_json_loader: bool,

    /// Directory for per-origin duration logs.
    pub durations_dir: String,

    /// Worker endpoints.
    pub services: ServiceUrls,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            debug: false,
            enable_json_loader: false,
            durations_dir: "logs".to_string(),
            services: ServiceUrls::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Supported env vars:
    /// - `LADLE_HTTP_PORT`
    /// - `LADLE_DEBUG`
    /// - `LADLE_ENABLE_JSON_LOADER`
    /// - `LADLE_DURATIONS_DIR`
    /// - `LADLE_SERVICE_CONFIG_B64` (required unless debug)
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but cannot be parsed,
    /// or if the service config blob is missing outside debug mode.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_u16("LADLE_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(debug) = env_bool("LADLE_DEBUG")? {
            config.debug = debug;
        }
        if let Some(enabled) = env_bool("LADLE_ENABLE_JSON_LOADER")? {
            config.enable_json_loader = enabled;
        }
        if let Some(dir) = env_string("LADLE_DURATIONS_DIR") {
            config.durations_dir = dir;
        }

        match env_string("LADLE_SERVICE_CONFIG_B64") {
            Some(blob) => config.services = ServiceUrls::from_b64(&blob)?,
            None if config.debug => {
                tracing::warn!("LADLE_SERVICE_CONFIG_B64 not set; worker forwards will fail");
            }
            None => {
                return Err(Error::Config(
                    "LADLE_SERVICE_CONFIG_B64 is required when LADLE_DEBUG=false".to_string(),
                ));
            }
        }

        Ok(config)
    }
}
