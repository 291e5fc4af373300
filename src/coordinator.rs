//! Batch coordination: one future per URL behind a shared admission gate.
//!
//! The [`Coordinator`] owns the fetcher, the extraction cascade, and the
//! [`AdmissionGate`]. [`Coordinator::run`] turns every input URL into exactly
//! one [`ResultRecord`], in completion order:
//!
//! 1. wait for a gate permit (or give up if the gate is draining)
//! 2. fetch with retries, holding the permit
//! 3. release the permit, then run the cascade on successful fetches only,
//!    on the blocking pool so HTML parsing never stalls other fetches
//! 4. merge outcome and extraction into a record

use crate::config::HarvestConfig;
use crate::error::ConfigError;
use crate::extract::Cascade;
use crate::fetcher::{Fetcher, ReqwestTransport, Transport};
use crate::gate::AdmissionGate;
use crate::models::{ExtractionResult, FetchOutcome, FetchStatus, ResultRecord, TransportErrorKind};
use futures::stream::{FuturesUnordered, StreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tracing::{debug, info, instrument, warn};

const PROGRESS_EVERY: usize = 100;

pub struct Coordinator<T, R> {
    fetcher: Fetcher<T, R>,
    cascade: Arc<Cascade>,
    gate: AdmissionGate,
}

impl<T, R> fmt::Debug for Coordinator<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("fetcher", &self.fetcher)
            .field("cascade", &self.cascade)
            .field("gate", &self.gate)
            .finish()
    }
}

impl Coordinator<ReqwestTransport, StdRng> {
    /// Build a production coordinator: pooled reqwest client and an
    /// OS-seeded user-agent picker.
    pub fn from_config(config: &HarvestConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let transport = ReqwestTransport::new(config)?;
        Self::new(config, transport, StdRng::from_os_rng())
    }
}

impl<T, R> Coordinator<T, R>
where
    T: Transport,
    R: Rng,
{
    pub fn new(config: &HarvestConfig, transport: T, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            fetcher: Fetcher::new(transport, rng, config),
            cascade: Arc::new(Cascade::new(config)?),
            gate: AdmissionGate::new(config.max_concurrent_requests),
        })
    }

    /// A handle to the gate, for draining the run from elsewhere.
    pub fn gate(&self) -> AdmissionGate {
        self.gate.clone()
    }

    pub fn fetcher(&self) -> &Fetcher<T, R> {
        &self.fetcher
    }

    /// Process every URL and return one record per input entry.
    ///
    /// Never fails: per-URL problems become records. Records arrive in
    /// completion order, not input order.
    ///
    /// # Arguments
    ///
    /// * `urls` - De-duplicated, non-empty URL strings
    ///
    /// # Returns
    ///
    /// Exactly one [`ResultRecord`] per input URL. URLs still waiting when
    /// the gate is drained get an `Error` record.
    #[instrument(level = "info", skip_all, fields(urls = urls.len(), limit = self.gate.limit()))]
    pub async fn run(&self, urls: Vec<String>) -> Vec<ResultRecord> {
        let t0 = Instant::now();
        let total = urls.len();
        info!(total, "Starting harvest");

        let mut pending: FuturesUnordered<_> =
            urls.into_iter().map(|url| self.process(url)).collect();

        let mut records = Vec::with_capacity(total);
        while let Some(record) = pending.next().await {
            records.push(record);
            if records.len() % PROGRESS_EVERY == 0 {
                info!(done = records.len(), total, "Harvest progress");
            }
        }

        let succeeded = records.iter().filter(|r| r.status.is_success()).count();
        info!(
            total,
            succeeded,
            failed = total - succeeded,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Harvest complete"
        );
        records
    }

    async fn process(&self, url: String) -> ResultRecord {
        let Some(permit) = self.gate.admit().await else {
            debug!(%url, "Gate draining; URL not admitted");
            let outcome = FetchOutcome::failure(
                url,
                FetchStatus::TransportError(TransportErrorKind::Drained),
                0,
            );
            return ResultRecord::from_outcome(&outcome, None);
        };

        let mut outcome = self.fetcher.fetch(&url, &self.gate).await;
        drop(permit);

        let extraction = match outcome.take_body() {
            Some(body) => Some(self.extract(body, url).await),
            None => None,
        };
        let record = ResultRecord::from_outcome(&outcome, extraction);
        debug!(
            url = %record.url,
            status = %record.status,
            source = %record.source,
            attempts = outcome.attempts(),
            "URL processed"
        );
        record
    }

    async fn extract(&self, html: String, url: String) -> ExtractionResult {
        let cascade = Arc::clone(&self.cascade);
        match task::spawn_blocking(move || cascade.extract_guarded(&html, &url)).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Extraction task failed");
                ExtractionResult::aborted(format!("extraction aborted: {e}"))
            }
        }
    }
}
