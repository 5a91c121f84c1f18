//! `ladle-extractor` binary entrypoint.
//!
//! Loads configuration from environment variables and either serves the
//! HTTP surface (default) or runs a single extraction and exits.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use ladle_core::observability::{LogFormat, init_logging};
use ladle_core::{MemoryBackend, ObjectStoreBackend, RunRequest, StorageBackend, StorageSink};
use ladle_extractor::config::Config;
use ladle_extractor::feed::HttpFeed;
use ladle_extractor::notify::{HttpNotifier, NullNotifier, TriggerNotifier};
use ladle_extractor::run::Extractor;
use ladle_extractor::server::Server;

#[derive(Parser)]
#[command(name = "ladle-extractor", about = "Chunked feed extractor for the Ladle pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP surface (default).
    Serve,
    /// Run a single extraction and exit.
    Extract {
        /// Calendar day to extract (`YYYY-MM-DD`); defaults to today.
        #[arg(long)]
        date: Option<String>,
        /// Upper bound on rows fetched this run; 0 means unbounded.
        #[arg(long, default_value_t = 0)]
        max_offset: u64,
    },
}

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    init_logging(choose_log_format(&config));
    config.validate()?;

    let storage: Arc<dyn StorageBackend> = if let Some(bucket) = config.bucket.as_deref() {
        tracing::info!(bucket = %bucket, "using object storage backend");
        Arc::new(ObjectStoreBackend::from_bucket(bucket)?)
    } else {
        tracing::warn!("LADLE_BUCKET not set; using in-memory storage backend (debug only)");
        Arc::new(MemoryBackend::new())
    };

    let feed = HttpFeed::new(
        config.source_url.clone(),
        Duration::from_secs(config.feed_timeout_secs),
    )?;
    let sink = StorageSink::new(Arc::clone(&storage));
    let notifier: Arc<dyn TriggerNotifier> = match config.trigger_url.as_deref() {
        Some(url) => Arc::new(HttpNotifier::new(url)?),
        None => Arc::new(NullNotifier),
    };

    let extractor = Arc::new(Extractor::new(
        storage,
        Arc::new(feed),
        Arc::new(sink),
        notifier,
    ));

    match cli.command {
        None | Some(Command::Serve) => {
            Server::new(config, extractor).serve().await?;
        }
        Some(Command::Extract { date, max_offset }) => {
            let request = RunRequest::quiet(date.unwrap_or_default(), max_offset);
            let outcome = extractor.run(request).await?;
            tracing::info!(
                date = %outcome.date,
                chunks = outcome.chunks_written,
                rows = outcome.rows_extracted,
                duration_seconds = outcome.duration_seconds,
                "extraction finished"
            );
        }
    }

    Ok(())
}
