//! Error types for configuration, input loading, and result output.
//!
//! Per-URL problems (HTTP statuses, transport failures, missing dates) are
//! never errors at this level: they become [`ResultRecord`](crate::models::ResultRecord)
//! rows. The types here cover failures that stop a run before or after the
//! batch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid CSS selector {selector:?} in domain hint for {host}")]
    Selector { host: String, selector: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("backoff_base must be a finite number >= 1.0, got {0}")]
    BackoffBase(f64),
    #[error("user_agents must contain at least one entry")]
    NoUserAgents,
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read input file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse CSV header in {path}: {source}")]
    Header {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("{path} has no URL-like column (expected one of: {expected})")]
    NoUrlColumn { path: String, expected: String },
    #[error("{path} contains no URLs")]
    Empty { path: String },
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error writing {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
