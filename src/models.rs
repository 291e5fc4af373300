//! Data models for fetch outcomes, extraction results, and result records.
//!
//! This module defines the core data structures that flow through the
//! harvesting pipeline:
//! - [`FetchOutcome`]: What the fetcher observed for one URL
//! - [`ExtractionResult`]: What the extraction cascade found in one document
//! - [`ResultRecord`]: The merged, per-URL row handed back to the caller
//!
//! Constructors enforce the pairing invariants (a body only on success, a
//! date only with a concrete source), so the fields are read-only outside
//! this module.

use serde::{Serialize, Serializer};
use std::fmt;

/// Classification of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection refused, reset, or DNS resolution failed.
    Connect,
    /// The response body could not be read to completion.
    Body,
    /// The response could not be decoded (bad encoding, malformed payload).
    Decode,
    /// Redirect loop or too many redirects.
    Redirect,
    /// The request could not be built or sent.
    Request,
    /// The run was drained before another attempt could start.
    Drained,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connect => "connection error",
            Self::Body => "body read error",
            Self::Decode => "payload decode error",
            Self::Redirect => "redirect error",
            Self::Request => "request error",
            Self::Drained => "run drained before fetch",
            Self::Other => "transport error",
        };
        f.write_str(s)
    }
}

/// Terminal status of one URL's fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Success,
    HttpError(u16),
    TransportError(TransportErrorKind),
    Timeout,
}

/// The result of fetching one URL, after retries are exhausted or on the
/// first success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    url: String,
    status: FetchStatus,
    body: Option<String>,
    attempts: u32,
}

impl FetchOutcome {
    /// A successful fetch carrying the decoded document.
    pub fn success(url: impl Into<String>, body: String, attempts: u32) -> Self {
        Self {
            url: url.into(),
            status: FetchStatus::Success,
            body: Some(body),
            attempts,
        }
    }

    /// A permanent failure. `status` must not be [`FetchStatus::Success`];
    /// if it is, the outcome is recorded as a transport error instead so the
    /// body invariant still holds.
    pub fn failure(url: impl Into<String>, status: FetchStatus, attempts: u32) -> Self {
        let status = match status {
            FetchStatus::Success => FetchStatus::TransportError(TransportErrorKind::Other),
            other => other,
        };
        Self {
            url: url.into(),
            status,
            body: None,
            attempts,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Move the document out, leaving the status and attempt count in place.
    pub fn take_body(&mut self) -> Option<String> {
        self.body.take()
    }

    /// Number of network attempts issued for this URL.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Which cascade strategy produced a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DateSource {
    Meta,
    StructuredData,
    Text,
    Script,
    None,
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Meta => "Meta",
            Self::StructuredData => "StructuredData",
            Self::Text => "Text",
            Self::Script => "Script",
            Self::None => "None",
        };
        f.write_str(s)
    }
}

/// What the extraction cascade found in one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    date: Option<String>,
    source: DateSource,
    note: Option<String>,
}

impl ExtractionResult {
    /// A date found by `source`. Passing [`DateSource::None`] yields an
    /// absent result, keeping date and source paired.
    pub fn found(date: String, source: DateSource) -> Self {
        if source == DateSource::None {
            return Self::not_found();
        }
        Self {
            date: Some(date),
            source,
            note: None,
        }
    }

    /// Every strategy was exhausted without a date.
    pub fn not_found() -> Self {
        Self {
            date: None,
            source: DateSource::None,
            note: None,
        }
    }

    /// Extraction was abandoned unexpectedly; `note` says why.
    pub fn aborted(note: impl Into<String>) -> Self {
        Self {
            date: None,
            source: DateSource::None,
            note: Some(note.into()),
        }
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn source(&self) -> DateSource {
        self.source
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }
}

/// Final status of one URL in the result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Success,
    DateNotFound,
    HttpStatus(u16),
    Error,
}

impl RecordStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("Success"),
            Self::DateNotFound => f.write_str("DateNotFound"),
            Self::HttpStatus(code) => write!(f, "HttpStatus:{code}"),
            Self::Error => f.write_str("Error"),
        }
    }
}

// Rendered as its table form (`HttpStatus:404`) so CSV and JSON agree.
impl Serialize for RecordStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Message recorded for documents where every strategy came up empty.
pub const DATE_NOT_FOUND_MESSAGE: &str = "no publication date found";

/// One row of output: a URL and what was learned about it.
///
/// # Invariants
///
/// - `status == Success` implies `date` is present
/// - `status == Error` implies `error` is present
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    pub url: String,
    pub date: Option<String>,
    pub source: DateSource,
    pub status: RecordStatus,
    pub error: Option<String>,
}

impl ResultRecord {
    /// Merge a fetch outcome with the cascade's result.
    ///
    /// `extraction` is consulted only when the fetch succeeded; callers pass
    /// `None` for failed fetches, and a successful fetch without an
    /// extraction is treated as "no date found".
    pub fn from_outcome(outcome: &FetchOutcome, extraction: Option<ExtractionResult>) -> Self {
        let url = outcome.url().to_string();
        match outcome.status() {
            FetchStatus::Success => {
                let extraction = extraction.unwrap_or_else(ExtractionResult::not_found);
                match extraction.date {
                    Some(date) => Self {
                        url,
                        date: Some(date),
                        source: extraction.source,
                        status: RecordStatus::Success,
                        error: None,
                    },
                    None => Self {
                        url,
                        date: None,
                        source: DateSource::None,
                        status: RecordStatus::DateNotFound,
                        error: Some(
                            extraction
                                .note
                                .unwrap_or_else(|| DATE_NOT_FOUND_MESSAGE.to_string()),
                        ),
                    },
                }
            }
            FetchStatus::HttpError(code) => Self {
                url,
                date: None,
                source: DateSource::None,
                status: RecordStatus::HttpStatus(code),
                error: if matches!(code, 404 | 410) {
                    None
                } else {
                    Some(format!("HTTP {code}"))
                },
            },
            FetchStatus::TransportError(kind) => Self::error(url, kind.to_string()),
            FetchStatus::Timeout => Self::error(url, "timeout"),
        }
    }

    /// A record for a URL that failed before or during fetching.
    pub fn error(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            date: None,
            source: DateSource::None,
            status: RecordStatus::Error,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_outcome_body_only_on_success() {
        let ok = FetchOutcome::success("https://example.com", "<html></html>".into(), 1);
        assert_eq!(ok.status(), FetchStatus::Success);
        assert!(ok.body().is_some());

        let failed = FetchOutcome::failure("https://example.com", FetchStatus::Timeout, 3);
        assert_eq!(failed.status(), FetchStatus::Timeout);
        assert!(failed.body().is_none());
        assert_eq!(failed.attempts(), 3);
    }

    #[test]
    fn test_take_body_keeps_status() {
        let mut ok = FetchOutcome::success("https://example.com", "<p>x</p>".into(), 2);
        assert_eq!(ok.take_body().as_deref(), Some("<p>x</p>"));
        assert_eq!(ok.take_body(), None);
        assert_eq!(ok.status(), FetchStatus::Success);
        assert_eq!(ok.attempts(), 2);
    }

    #[test]
    fn test_fetch_outcome_failure_rejects_success_status() {
        let outcome = FetchOutcome::failure("https://example.com", FetchStatus::Success, 1);
        assert_ne!(outcome.status(), FetchStatus::Success);
        assert!(outcome.body().is_none());
    }

    #[test]
    fn test_extraction_result_pairs_date_and_source() {
        let found = ExtractionResult::found("2024-03-12".into(), DateSource::Text);
        assert_eq!(found.date(), Some("2024-03-12"));
        assert_eq!(found.source(), DateSource::Text);

        let coerced = ExtractionResult::found("2024-03-12".into(), DateSource::None);
        assert_eq!(coerced.date(), None);
        assert_eq!(coerced.source(), DateSource::None);
    }

    #[test]
    fn test_record_success() {
        let outcome = FetchOutcome::success("https://example.com/a", String::new(), 1);
        let extraction = ExtractionResult::found("2023-05-11".into(), DateSource::Meta);
        let record = ResultRecord::from_outcome(&outcome, Some(extraction));

        assert_eq!(record.status, RecordStatus::Success);
        assert_eq!(record.date.as_deref(), Some("2023-05-11"));
        assert_eq!(record.source, DateSource::Meta);
        assert_eq!(record.error, None);
    }

    #[test]
    fn test_record_date_not_found() {
        let outcome = FetchOutcome::success("https://example.com/a", String::new(), 1);
        let record = ResultRecord::from_outcome(&outcome, Some(ExtractionResult::not_found()));

        assert_eq!(record.status, RecordStatus::DateNotFound);
        assert_eq!(record.source, DateSource::None);
        assert_eq!(record.error.as_deref(), Some(DATE_NOT_FOUND_MESSAGE));
    }

    #[test]
    fn test_record_aborted_extraction_keeps_note() {
        let outcome = FetchOutcome::success("https://example.com/a", String::new(), 1);
        let record = ResultRecord::from_outcome(
            &outcome,
            Some(ExtractionResult::aborted("extraction panicked: boom")),
        );

        assert_eq!(record.status, RecordStatus::DateNotFound);
        assert_eq!(record.error.as_deref(), Some("extraction panicked: boom"));
    }

    #[test]
    fn test_record_expected_absence_has_no_error() {
        for code in [404, 410] {
            let outcome =
                FetchOutcome::failure("https://example.com/gone", FetchStatus::HttpError(code), 1);
            let record = ResultRecord::from_outcome(&outcome, None);
            assert_eq!(record.status, RecordStatus::HttpStatus(code));
            assert_eq!(record.error, None);
            assert_eq!(record.date, None);
        }
    }

    #[test]
    fn test_record_other_http_status_is_error() {
        let outcome = FetchOutcome::failure("https://example.com", FetchStatus::HttpError(500), 1);
        let record = ResultRecord::from_outcome(&outcome, None);
        assert_eq!(record.status, RecordStatus::HttpStatus(500));
        assert_eq!(record.error.as_deref(), Some("HTTP 500"));
    }

    #[test]
    fn test_record_transport_and_timeout() {
        let outcome = FetchOutcome::failure(
            "https://example.com",
            FetchStatus::TransportError(TransportErrorKind::Connect),
            3,
        );
        let record = ResultRecord::from_outcome(&outcome, None);
        assert_eq!(record.status, RecordStatus::Error);
        assert_eq!(record.error.as_deref(), Some("connection error"));

        let outcome = FetchOutcome::failure("https://example.com", FetchStatus::Timeout, 3);
        let record = ResultRecord::from_outcome(&outcome, None);
        assert_eq!(record.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(RecordStatus::Success.to_string(), "Success");
        assert_eq!(RecordStatus::DateNotFound.to_string(), "DateNotFound");
        assert_eq!(RecordStatus::HttpStatus(410).to_string(), "HttpStatus:410");
        assert_eq!(RecordStatus::Error.to_string(), "Error");
        assert_eq!(DateSource::StructuredData.to_string(), "StructuredData");
    }

    #[test]
    fn test_record_serialization() {
        let record = ResultRecord {
            url: "https://example.com/b".to_string(),
            date: None,
            source: DateSource::None,
            status: RecordStatus::HttpStatus(410),
            error: None,
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""status":"HttpStatus:410""#));
        assert!(json.contains(r#""source":"None""#));
    }
}
