//! Command-line interface definitions for the harvester.
//!
//! Tuning flags can also be set through environment variables and override
//! values from the YAML config file.

use crate::config::HarvestConfig;
use clap::{Parser, ValueEnum};

/// Result file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Csv,
    Json,
    Both,
}

impl Format {
    pub fn wants_csv(self) -> bool {
        matches!(self, Self::Csv | Self::Both)
    }

    pub fn wants_json(self) -> bool {
        matches!(self, Self::Json | Self::Both)
    }
}

/// Harvest publication dates for a list of article URLs.
///
/// # Examples
///
/// ```sh
/// # Default settings, CSV results in ./results
/// pubdate_harvest urls.csv -o ./results
///
/// # Gentler crawl with a config file
/// pubdate_harvest urls.csv -c harvest.yaml --max-concurrent 8 --retries 5
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// CSV file with a url/link/source column
    pub input: String,

    /// Directory for result files
    #[arg(short, long, default_value = "results")]
    pub output_dir: String,

    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Result file format
    #[arg(short, long, value_enum, default_value_t = Format::Csv)]
    pub format: Format,

    /// Maximum simultaneous fetches
    #[arg(long, env = "PUBDATE_MAX_CONCURRENT")]
    pub max_concurrent: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, env = "PUBDATE_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Attempts per URL, including the first
    #[arg(long, env = "PUBDATE_RETRIES")]
    pub retries: Option<u32>,

    /// Exponential backoff base in seconds
    #[arg(long, env = "PUBDATE_BACKOFF_BASE")]
    pub backoff_base: Option<f64>,

    /// Retry 5xx responses like transport failures
    #[arg(long, env = "PUBDATE_RETRY_SERVER_ERRORS")]
    pub retry_server_errors: bool,
}

impl Cli {
    /// Apply flag overrides on top of `config`.
    pub fn apply_overrides(&self, config: &mut HarvestConfig) {
        if let Some(n) = self.max_concurrent {
            config.max_concurrent_requests = n;
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout_secs = secs;
        }
        if let Some(n) = self.retries {
            config.retry_attempts = n;
        }
        if let Some(base) = self.backoff_base {
            config.backoff_base = base;
        }
        if self.retry_server_errors {
            config.retry_server_errors = true;
        }
    }
}
