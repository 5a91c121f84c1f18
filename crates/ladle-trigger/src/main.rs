//! `ladle-trigger` binary entrypoint.
//!
//! Loads configuration from environment variables and starts the HTTP
//! server. A missing or undecodable service config blob is fatal.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use anyhow::Result;

use ladle_core::observability::{LogFormat, init_logging};
use ladle_trigger::config::Config;
use ladle_trigger::dispatch::HttpDispatcher;
use ladle_trigger::durations::DurationLog;
use ladle_trigger::routing::Router;
use ladle_trigger::server::Server;

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_logging(choose_log_format(&config));

    tracing::info!(
        extractor = %config.services.extractor.url,
        cleaner = %config.services.cleaner.url,
        loader_json = %config.services.loader.url,
        loader_parquet = %config.services.loader_parquet.url,
        json_loader_enabled = config.enable_json_loader,
        "trigger service starting"
    );

    let dispatcher = Arc::new(HttpDispatcher::new(config.services.clone())?);
    let durations = DurationLog::new(config.durations_dir.clone());
    let router = Arc::new(Router::new(
        dispatcher,
        durations,
        config.enable_json_loader,
    ));

    Server::new(config, router).serve().await?;
    Ok(())
}
