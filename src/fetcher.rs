//! Single-URL fetching with timeout, retry, and exponential backoff.
//!
//! This module provides the network half of the pipeline. It uses a
//! trait-based design so the retry policy can be exercised without a network:
//! - [`Transport`]: Core trait issuing one GET and classifying the reply
//! - [`ReqwestTransport`]: Production transport backed by a pooled `reqwest::Client`
//! - [`Fetcher`]: Drives the retry state machine over any `Transport`
//!
//! # Retry Strategy
//!
//! - HTTP 200: body decoded with the declared charset, done
//! - Any other HTTP status: permanent failure, no retry (404/410 are
//!   reported as expected absence by the record layer). With
//!   `retry_server_errors`, 5xx statuses are retried like transport failures.
//! - Transport failure or timeout: retried up to `retry_attempts` total
//!   attempts, sleeping `backoff_base^(n-1)` seconds after failed attempt `n`
//! - A draining [`AdmissionGate`] stops further attempts

use crate::config::HarvestConfig;
use crate::error::ConfigError;
use crate::gate::AdmissionGate;
use crate::models::{FetchOutcome, FetchStatus, TransportErrorKind};
use crate::utils::truncate_for_log;
use parking_lot::Mutex;
use rand::Rng;
use rand::seq::IndexedRandom;
use reqwest::header::USER_AGENT;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

const MAX_LOGGED_ERROR: usize = 200;

/// What a transport observed for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpReply {
    /// Status 200 with the decoded body.
    Ok(String),
    /// Any other status; the body is not read.
    Status(u16),
}

/// A failed request, before any response status was available.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("{kind}: {message}")]
    Failed {
        kind: TransportErrorKind,
        message: String,
    },
}

impl TransportError {
    pub fn failed(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    fn status(&self) -> FetchStatus {
        match self {
            Self::Timeout => FetchStatus::Timeout,
            Self::Failed { kind, .. } => FetchStatus::TransportError(*kind),
        }
    }
}

/// Trait for issuing a single GET request.
///
/// Implementors perform exactly one network attempt per call; retrying is
/// the [`Fetcher`]'s job.
pub trait Transport {
    /// Fetch `url` sending `user_agent` as the `User-Agent` header.
    async fn get(&self, url: &str, user_agent: &str) -> Result<HttpReply, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
///
/// The client carries the per-request timeout and caps idle pooled
/// connections per host at the concurrency limit.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &HarvestConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .pool_max_idle_per_host(config.max_concurrent_requests)
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, user_agent: &str) -> Result<HttpReply, TransportError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        if status != 200 {
            return Ok(HttpReply::Status(status));
        }

        // Decodes with the Content-Type charset (UTF-8 if absent or unknown),
        // replacing undecodable bytes.
        let body = response.text().await.map_err(classify)?;
        Ok(HttpReply::Ok(body))
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        return TransportError::Timeout;
    }
    let kind = if e.is_connect() {
        TransportErrorKind::Connect
    } else if e.is_redirect() {
        TransportErrorKind::Redirect
    } else if e.is_body() {
        TransportErrorKind::Body
    } else if e.is_decode() {
        TransportErrorKind::Decode
    } else if e.is_request() || e.is_builder() {
        TransportErrorKind::Request
    } else {
        TransportErrorKind::Other
    };
    TransportError::failed(kind, e.to_string())
}

/// Drives one URL through the retry state machine.
///
/// The random source used to pick a `User-Agent` is injected, so tests can
/// seed it and production can use an OS-seeded generator.
pub struct Fetcher<T, R> {
    transport: T,
    rng: Mutex<R>,
    user_agents: Vec<String>,
    retry_attempts: u32,
    config: HarvestConfig,
}

impl<T, R> fmt::Debug for Fetcher<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("user_agents", &self.user_agents.len())
            .field("retry_attempts", &self.retry_attempts)
            .field("backoff_base", &self.config.backoff_base)
            .field("retry_server_errors", &self.config.retry_server_errors)
            .finish()
    }
}

impl<T, R> Fetcher<T, R>
where
    T: Transport,
    R: Rng,
{
    pub fn new(transport: T, rng: R, config: &HarvestConfig) -> Self {
        let user_agents = config
            .user_agents
            .iter()
            .filter(|ua| !ua.trim().is_empty())
            .cloned()
            .collect();
        Self {
            transport,
            rng: Mutex::new(rng),
            user_agents,
            retry_attempts: config.retry_attempts.max(1),
            config: config.clone(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn pick_user_agent(&self) -> String {
        let mut rng = self.rng.lock();
        self.user_agents
            .choose(&mut *rng)
            .cloned()
            .unwrap_or_default()
    }

    /// Fetch `url`, retrying transient failures.
    ///
    /// Always returns an outcome; no error escapes. The gate is consulted
    /// only between attempts: a fetch already in flight is never interrupted,
    /// but a drain during a backoff sleep ends the sleep and the fetch.
    ///
    /// # Arguments
    ///
    /// * `url` - The page to request
    /// * `gate` - The run's admission gate, watched for draining
    ///
    /// # Returns
    ///
    /// A [`FetchOutcome`] carrying the decoded body on status 200, otherwise
    /// the last failure classification and the number of attempts made.
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn fetch(&self, url: &str, gate: &AdmissionGate) -> FetchOutcome {
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let user_agent = self.pick_user_agent();
            let attempt_t0 = Instant::now();

            let (failure, reason) = match self.transport.get(url, &user_agent).await {
                Ok(HttpReply::Ok(body)) => {
                    debug!(
                        attempt,
                        bytes = body.len(),
                        elapsed_ms = attempt_t0.elapsed().as_millis(),
                        "Fetched document"
                    );
                    return FetchOutcome::success(url, body, attempt);
                }
                Ok(HttpReply::Status(code))
                    if self.config.retry_server_errors && (500..600).contains(&code) =>
                {
                    (FetchStatus::HttpError(code), format!("HTTP {code}"))
                }
                Ok(HttpReply::Status(code)) => {
                    debug!(attempt, status = code, "Non-200 response; not retrying");
                    return FetchOutcome::failure(url, FetchStatus::HttpError(code), attempt);
                }
                Err(e) => (e.status(), e.to_string()),
            };

            if attempt >= self.retry_attempts {
                error!(
                    attempt,
                    max = self.retry_attempts,
                    elapsed_ms_total = total_t0.elapsed().as_millis(),
                    error = %truncate_for_log(&reason, MAX_LOGGED_ERROR),
                    "Fetch exhausted retries"
                );
                return FetchOutcome::failure(url, failure, attempt);
            }

            if gate.is_draining() {
                warn!(
                    attempt,
                    error = %truncate_for_log(&reason, MAX_LOGGED_ERROR),
                    "Gate draining; abandoning retries"
                );
                return FetchOutcome::failure(url, failure, attempt);
            }

            let delay = self.config.backoff_delay(attempt);
            warn!(
                attempt,
                max = self.retry_attempts,
                elapsed_ms_attempt = attempt_t0.elapsed().as_millis(),
                ?delay,
                error = %truncate_for_log(&reason, MAX_LOGGED_ERROR),
                "Fetch attempt failed; backing off"
            );
            tokio::select! {
                _ = sleep(delay) => {}
                _ = gate.drained() => {
                    warn!(attempt, "Gate drained during backoff; abandoning retries");
                    return FetchOutcome::failure(url, failure, attempt);
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use httpmock::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::VecDeque;

    /// Replays scripted replies in order and records what it was asked.
    pub(crate) struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<HttpReply, TransportError>>>,
        pub(crate) user_agents: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(replies: Vec<Result<HttpReply, TransportError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                user_agents: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.user_agents.lock().len()
        }
    }

    impl Transport for ScriptedTransport {
        async fn get(&self, _url: &str, user_agent: &str) -> Result<HttpReply, TransportError> {
            self.user_agents.lock().push(user_agent.to_string());
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(TransportError::failed(
                        TransportErrorKind::Other,
                        "script exhausted",
                    ))
                })
        }
    }

    fn connect_error() -> Result<HttpReply, TransportError> {
        Err(TransportError::failed(
            TransportErrorKind::Connect,
            "connection refused",
        ))
    }

    fn fetcher(
        transport: ScriptedTransport,
        config: &HarvestConfig,
    ) -> Fetcher<ScriptedTransport, StdRng> {
        Fetcher::new(transport, StdRng::seed_from_u64(7), config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_third_attempt_after_two_backoffs() {
        let transport = ScriptedTransport::new(vec![
            connect_error(),
            Err(TransportError::Timeout),
            Ok(HttpReply::Ok("<html></html>".to_string())),
        ]);
        let fetcher = fetcher(transport, &HarvestConfig::default());
        let gate = AdmissionGate::new(1);

        let t0 = tokio::time::Instant::now();
        let outcome = fetcher.fetch("https://example.com/a", &gate).await;
        let elapsed = t0.elapsed();

        assert_eq!(outcome.status(), FetchStatus::Success);
        assert_eq!(outcome.body(), Some("<html></html>"));
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(fetcher.transport().calls(), 3);
        // Backoffs of 2^0 and 2^1 seconds.
        assert!(elapsed >= Duration::from_secs(3), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(4), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_keep_last_classification() {
        let transport = ScriptedTransport::new(vec![
            connect_error(),
            connect_error(),
            Err(TransportError::Timeout),
        ]);
        let fetcher = fetcher(transport, &HarvestConfig::default());

        let outcome = fetcher.fetch("https://example.com/a", &AdmissionGate::new(1)).await;

        assert_eq!(outcome.status(), FetchStatus::Timeout);
        assert_eq!(outcome.body(), None);
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(fetcher.transport().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_http_status_is_not_retried() {
        for code in [404, 410, 500, 503] {
            let transport = ScriptedTransport::new(vec![
                Ok(HttpReply::Status(code)),
                Ok(HttpReply::Ok(String::new())),
            ]);
            let fetcher = fetcher(transport, &HarvestConfig::default());

            let outcome = fetcher.fetch("https://example.com/a", &AdmissionGate::new(1)).await;

            assert_eq!(outcome.status(), FetchStatus::HttpError(code));
            assert_eq!(outcome.attempts(), 1);
            assert_eq!(fetcher.transport().calls(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_retried_when_enabled() {
        let config = HarvestConfig {
            retry_server_errors: true,
            ..HarvestConfig::default()
        };
        let transport = ScriptedTransport::new(vec![
            Ok(HttpReply::Status(503)),
            Ok(HttpReply::Status(404)),
        ]);
        let fetcher = fetcher(transport, &config);

        let outcome = fetcher.fetch("https://example.com/a", &AdmissionGate::new(1)).await;

        assert_eq!(outcome.status(), FetchStatus::HttpError(404));
        assert_eq!(outcome.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_draining_gate_stops_retries() {
        let transport =
            ScriptedTransport::new(vec![connect_error(), Ok(HttpReply::Ok(String::new()))]);
        let fetcher = fetcher(transport, &HarvestConfig::default());
        let gate = AdmissionGate::new(1);
        gate.drain();

        let outcome = fetcher.fetch("https://example.com/a", &gate).await;

        assert_eq!(
            outcome.status(),
            FetchStatus::TransportError(TransportErrorKind::Connect)
        );
        assert_eq!(fetcher.transport().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_during_backoff_cuts_sleep_and_skips_attempt() {
        let transport =
            ScriptedTransport::new(vec![connect_error(), Ok(HttpReply::Ok(String::new()))]);
        let fetcher = fetcher(transport, &HarvestConfig::default());
        let gate = AdmissionGate::new(1);

        let t0 = tokio::time::Instant::now();
        let drain_later = async {
            sleep(Duration::from_millis(500)).await;
            gate.drain();
        };
        let (outcome, ()) = tokio::join!(
            fetcher.fetch("https://example.com/a", &gate),
            drain_later
        );
        let elapsed = t0.elapsed();

        assert_eq!(
            outcome.status(),
            FetchStatus::TransportError(TransportErrorKind::Connect)
        );
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(fetcher.transport().calls(), 1, "no attempt may start after a drain");
        // The 1s backoff was cut short at the drain.
        assert!(elapsed < Duration::from_secs(1), "elapsed {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_agent_drawn_from_pool() {
        let config = HarvestConfig {
            retry_attempts: 20,
            backoff_base: 1.0,
            ..HarvestConfig::default()
        };
        let transport = ScriptedTransport::new((0..20).map(|_| connect_error()).collect());
        let fetcher = fetcher(transport, &config);

        fetcher.fetch("https://example.com/a", &AdmissionGate::new(1)).await;

        let seen = fetcher.transport().user_agents.lock().clone();
        assert_eq!(seen.len(), 20);
        assert!(seen.iter().all(|ua| config.user_agents.contains(ua)));
        assert!(
            seen.iter().any(|ua| ua != &seen[0]),
            "20 draws over a pool of 4 should not all match"
        );
    }

    #[tokio::test]
    async fn test_reqwest_transport_reads_ok_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/article")
                    .header_exists("user-agent");
                then.status(200)
                    .header("content-type", "text/html; charset=utf-8")
                    .body("<html><body>hi</body></html>");
            })
            .await;

        let transport = ReqwestTransport::new(&HarvestConfig::default()).unwrap();
        let reply = transport.get(&server.url("/article"), "test-agent").await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply, HttpReply::Ok("<html><body>hi</body></html>".to_string()));
    }

    #[tokio::test]
    async fn test_reqwest_transport_decodes_declared_charset() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/latin1");
                then.status(200)
                    .header("content-type", "text/html; charset=ISO-8859-1")
                    .body(b"caf\xe9".to_vec());
            })
            .await;

        let transport = ReqwestTransport::new(&HarvestConfig::default()).unwrap();
        let reply = transport.get(&server.url("/latin1"), "ua").await.unwrap();

        assert_eq!(reply, HttpReply::Ok("café".to_string()));
    }

    #[tokio::test]
    async fn test_reqwest_transport_replaces_invalid_utf8() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/broken");
                then.status(200)
                    .header("content-type", "text/html")
                    .body(b"ok \xff\xfe end".to_vec());
            })
            .await;

        let transport = ReqwestTransport::new(&HarvestConfig::default()).unwrap();
        let reply = transport.get(&server.url("/broken"), "ua").await.unwrap();

        assert_eq!(reply, HttpReply::Ok("ok \u{fffd}\u{fffd} end".to_string()));
    }

    #[tokio::test]
    async fn test_reqwest_transport_reports_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing");
                then.status(404).body("not here");
            })
            .await;

        let transport = ReqwestTransport::new(&HarvestConfig::default()).unwrap();
        let reply = transport.get(&server.url("/missing"), "ua").await.unwrap();

        assert_eq!(reply, HttpReply::Status(404));
    }

    #[tokio::test]
    async fn test_reqwest_transport_connect_error() {
        let transport = ReqwestTransport::new(&HarvestConfig::default()).unwrap();
        let err = transport.get("http://127.0.0.1:1/", "ua").await.unwrap_err();

        assert!(matches!(
            err,
            TransportError::Failed {
                kind: TransportErrorKind::Connect,
                ..
            }
        ));
    }
}
