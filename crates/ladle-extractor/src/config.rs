//! Extractor service configuration.

use ladle_core::config::{env_bool, env_string, env_u16, env_u64};

use crate::error::{Error, Result};

/// Default upstream feed: the Chicago food-inspections dataset.
pub const DEFAULT_SOURCE_URL: &str = "https://data.cityofchicago.org/resource/qizy-d2wf.json";

/// Configuration for the extractor service.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub http_port: u16,

    /// Enable debug mode.
    ///
    /// When enabled, logs are pretty-printed and the in-memory storage
    /// backend is allowed (no bucket required).
    pub debug: bool,

    /// Object storage bucket for raw chunks, checkpoint, and telemetry
    /// (e.g. `my-bucket`, `gs://my-bucket`, `s3://my-bucket`).
    pub bucket: Option<String>,

    /// Full URL of the trigger's event ingress.
    pub trigger_url: Option<String>,

    /// Base URL of the paginated source feed.
    pub source_url: String,

    /// Per-request timeout for feed fetches, in seconds.
    pub feed_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            debug: false,
            bucket: None,
            trigger_url: None,
            source_url: DEFAULT_SOURCE_URL.to_string(),
            feed_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Supported env vars:
    /// - `LADLE_HTTP_PORT`
    /// - `LADLE_DEBUG`
    /// - `LADLE_BUCKET`
    /// - `LADLE_TRIGGER_URL`
    /// - `LADLE_SOURCE_URL`
    /// - `LADLE_FEED_TIMEOUT_SECS`
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_u16("LADLE_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(debug) = env_bool("LADLE_DEBUG")? {
            config.debug = debug;
        }
        config.bucket = env_string("LADLE_BUCKET");
        config.trigger_url = env_string("LADLE_TRIGGER_URL");
        if let Some(url) = env_string("LADLE_SOURCE_URL") {
            config.source_url = url;
        }
        if let Some(secs) = env_u64("LADLE_FEED_TIMEOUT_SECS")? {
            if secs == 0 {
                return Err(Error::Config(
                    "LADLE_FEED_TIMEOUT_SECS must be greater than 0".to_string(),
                ));
            }
            config.feed_timeout_secs = secs;
        }

        Ok(config)
    }

    /// Validates that production requirements are met.
    ///
    /// # Errors
    ///
    /// Returns an error if a bucket or trigger URL is missing outside
    /// debug mode.
    pub fn validate(&self) -> Result<()> {
        if !self.debug && self.bucket.is_none() {
            return Err(Error::Config(
                "LADLE_BUCKET is required when LADLE_DEBUG=false".to_string(),
            ));
        }
        if !self.debug && self.trigger_url.is_none() {
            return Err(Error::Config(
                "LADLE_TRIGGER_URL is required when LADLE_DEBUG=false".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_public_feed() {
        let config = Config::default();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.source_url, DEFAULT_SOURCE_URL);
        assert_eq!(config.feed_timeout_secs, 30);
    }

    #[test]
    fn validate_requires_bucket_outside_debug() {
        let config = Config {
            trigger_url: Some("http://trigger:8080/clean".into()),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("LADLE_BUCKET"));
    }

    #[test]
    fn validate_requires_trigger_url_outside_debug() {
        let config = Config {
            bucket: Some("inspections".into()),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("LADLE_TRIGGER_URL"));
    }

    #[test]
    fn debug_mode_relaxes_requirements() {
        let config = Config {
            debug: true,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }
}
