//! Harvest configuration.
//!
//! [`HarvestConfig`] is an explicit value handed to the
//! [`Coordinator`](crate::coordinator::Coordinator) at construction time.
//! Defaults match the tuning the tool has been run with; a YAML file can
//! override any subset of fields, and the CLI can override the numeric knobs
//! on top of that.
//!
//! # Example
//!
//! ```yaml
//! max_concurrent_requests: 16
//! request_timeout_secs: 10
//! domain_hints:
//!   - host_contains: "factcheck.example.org"
//!     selectors:
//!       - css: "div.byline time"
//!         attr: datetime
//! ```

use crate::error::ConfigError;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

/// A CSS selector and the attribute to read from the first match.
///
/// When `attr` is `None` the element's visible text is used instead.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SelectorSpec {
    pub css: String,
    #[serde(default)]
    pub attr: Option<String>,
}

impl SelectorSpec {
    pub fn attr(css: &str, attr: &str) -> Self {
        Self {
            css: css.to_string(),
            attr: Some(attr.to_string()),
        }
    }

    pub fn text(css: &str) -> Self {
        Self {
            css: css.to_string(),
            attr: None,
        }
    }
}

/// Extra high-priority metadata selectors for hosts containing `host_contains`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DomainHint {
    pub host_contains: String,
    pub selectors: Vec<SelectorSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Upper bound on simultaneously in-flight fetches (and pooled connections per host).
    pub max_concurrent_requests: usize,
    /// Total timeout for a single request attempt, in seconds.
    pub request_timeout_secs: u64,
    /// Network attempts per URL, including the first.
    pub retry_attempts: u32,
    /// Backoff before attempt `n + 1` is `backoff_base^(n - 1)` seconds.
    pub backoff_base: f64,
    /// Pool of `User-Agent` strings; one is picked uniformly per attempt.
    pub user_agents: Vec<String>,
    pub domain_hints: Vec<DomainHint>,
    /// Retry 5xx responses like transport failures instead of failing fast.
    pub retry_server_errors: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 30,
            request_timeout_secs: 20,
            retry_attempts: 3,
            backoff_base: 2.0,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1".to_string(),
            ],
            domain_hints: vec![DomainHint {
                host_contains: "afp.com".to_string(),
                selectors: vec![
                    SelectorSpec::attr("time[datetime]", "datetime"),
                    SelectorSpec::attr(r#"meta[property="article:published_time"]"#, "content"),
                    SelectorSpec::text("span.article-date"),
                ],
            }],
            retry_server_errors: false,
        }
    }
}

impl HarvestConfig {
    /// Load a config from a YAML file. Missing fields take their defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path_str.clone(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path_str,
            source,
        })?;
        debug!(?config, "Loaded harvest config");
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Sleep before the attempt following failed attempt `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        Duration::try_from_secs_f64(self.backoff_base.powi(exponent)).unwrap_or(Duration::MAX)
    }

    /// Reject configurations that could never make progress.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::Zero("max_concurrent_requests"));
        }
        if self.retry_attempts == 0 {
            return Err(ConfigError::Zero("retry_attempts"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Zero("request_timeout_secs"));
        }
        if !self.backoff_base.is_finite() || self.backoff_base < 1.0 {
            return Err(ConfigError::BackoffBase(self.backoff_base));
        }
        if self.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(ConfigError::NoUserAgents);
        }
        for hint in &self.domain_hints {
            for spec in &hint.selectors {
                if Selector::parse(&spec.css).is_err() {
                    return Err(ConfigError::Selector {
                        host: hint.host_contains.clone(),
                        selector: spec.css.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
