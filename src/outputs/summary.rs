//! End-of-run tally with a few example rows.

use crate::models::ResultRecord;
use tracing::info;

/// Sample rows kept per category.
pub const SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary<'a> {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub successes: Vec<&'a ResultRecord>,
    pub failures: Vec<&'a ResultRecord>,
}

impl<'a> Summary<'a> {
    pub fn new(records: &'a [ResultRecord]) -> Self {
        let (ok, rest): (Vec<_>, Vec<_>) = records.iter().partition(|r| r.status.is_success());
        Self {
            total: records.len(),
            succeeded: ok.len(),
            failed: rest.len(),
            successes: ok.into_iter().take(SAMPLE_SIZE).collect(),
            failures: rest.into_iter().take(SAMPLE_SIZE).collect(),
        }
    }

    /// Share of URLs with a date, as a percentage. Zero for an empty run.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f64 * 100.0 / self.total as f64
        }
    }

    pub fn log(&self) {
        info!(
            total = self.total,
            succeeded = self.succeeded,
            failed = self.failed,
            success_rate = %format!("{:.1}%", self.success_rate()),
            "Harvest summary"
        );
        for r in &self.successes {
            info!(
                url = %r.url,
                date = r.date.as_deref().unwrap_or(""),
                source = %r.source,
                "Sample success"
            );
        }
        for r in &self.failures {
            info!(
                url = %r.url,
                status = %r.status,
                error = r.error.as_deref().unwrap_or(""),
                "Sample failure"
            );
        }
    }
}
