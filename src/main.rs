//! # pubdate_harvest
//!
//! Reads a CSV of article URLs, recovers each page's publication date, and
//! writes a result table.
//!
//! ## Usage
//!
//! ```sh
//! pubdate_harvest urls.csv -o ./results
//! ```
//!
//! ## Pipeline
//!
//! 1. **Config**: YAML file (optional), then flag and env overrides, then validation
//! 2. **Input**: load and de-duplicate URLs
//! 3. **Harvest**: fetch and extract with bounded concurrency; Ctrl-C drains the run
//! 4. **Output**: write CSV and/or JSON results and log a summary

use clap::Parser;
use pubdate_harvest::cli::Cli;
use pubdate_harvest::config::HarvestConfig;
use pubdate_harvest::coordinator::Coordinator;
use pubdate_harvest::inputs::load_urls;
use pubdate_harvest::outputs::summary::Summary;
use pubdate_harvest::outputs::{json, results_path, table, timestamp};
use pubdate_harvest::utils::ensure_writable_dir;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("pubdate_harvest starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // --- Config: file, then overrides, then validation ---
    let mut config = match args.config.as_deref() {
        Some(path) => HarvestConfig::from_yaml_file(path)?,
        None => HarvestConfig::default(),
    };
    args.apply_overrides(&mut config);
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }
    info!(
        max_concurrent = config.max_concurrent_requests,
        timeout_secs = config.request_timeout_secs,
        retries = config.retry_attempts,
        backoff_base = config.backoff_base,
        retry_server_errors = config.retry_server_errors,
        "Configuration loaded"
    );

    // Early check: fail on a bad output dir before spending time fetching
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let urls = load_urls(&args.input).await?;

    // ---- Harvest ----
    let coordinator = Coordinator::from_config(&config)?;
    let gate = coordinator.gate();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing in-flight requests");
            gate.drain();
        }
    });

    let records = coordinator.run(urls).await;

    // ---- Output ----
    let stamp = timestamp();
    if args.format.wants_csv() {
        table::write_csv(&records, results_path(&args.output_dir, &stamp, "csv")).await?;
    }
    if args.format.wants_json() {
        json::write_records(&records, results_path(&args.output_dir, &stamp, "json")).await?;
    }

    Summary::new(&records).log();

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "pubdate_harvest finished"
    );
    Ok(())
}
