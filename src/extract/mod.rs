//! Publication date extraction from fetched HTML.
//!
//! A [`Cascade`] tries an ordered set of strategies against one parsed
//! document and stops at the first that yields a date the
//! [normalizer](crate::normalize::normalize_date) accepts:
//!
//! | Order | Strategy | Module | Tagged as |
//! |-------|----------|--------|-----------|
//! | 1 | Meta and `<time>` tags, domain hints first | [`meta`] | `Meta` |
//! | 2 | JSON-LD blocks (`application/ld+json`) | [`jsonld`] | `StructuredData` |
//! | 3 | Visible page text | [`patterns`] | `Text` |
//! | 4 | Inline `<script>` source | [`patterns`] | `Script` |
//!
//! If every strategy comes up empty the result is an absent date tagged
//! `None`. Malformed markup or JSON never fails the cascade; the offending
//! piece is skipped and the next candidate is tried.

pub mod jsonld;
pub mod meta;
pub mod patterns;

use crate::config::HarvestConfig;
use crate::error::ConfigError;
use crate::models::{DateSource, ExtractionResult};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, instrument, warn};
use url::Url;

pub(crate) static SCRIPT: Lazy<Selector> = Lazy::new(|| Selector::parse("script").unwrap());

/// Metadata selectors tried on every page, in priority order.
const BASE_SELECTORS: &[(&str, Option<&str>)] = &[
    (r#"meta[property="article:published_time"]"#, Some("content")),
    (r#"meta[name="article:published_time"]"#, Some("content")),
    (r#"meta[name="datePublished"]"#, Some("content")),
    (r#"meta[itemprop="datePublished"]"#, Some("content")),
    (r#"meta[name="pubdate"]"#, Some("content")),
    (r#"meta[name="publish-date"]"#, Some("content")),
    (r#"meta[name="DC.date.issued"]"#, Some("content")),
    (r#"meta[name="DC.date.created"]"#, Some("content")),
    (r#"meta[property="og:updated_time"]"#, Some("content")),
    ("time[datetime]", Some("datetime")),
    ("time", None),
];

/// A parsed selector plus the attribute to read (or `None` for element text).
#[derive(Debug)]
pub struct CompiledSelector {
    pub(crate) selector: Selector,
    pub(crate) attr: Option<String>,
}

impl CompiledSelector {
    fn compile(css: &str, attr: Option<&str>) -> Option<Self> {
        Selector::parse(css).ok().map(|selector| Self {
            selector,
            attr: attr.map(str::to_string),
        })
    }
}

#[derive(Debug)]
struct CompiledHint {
    host_contains: String,
    selectors: Vec<CompiledSelector>,
}

/// The ordered extraction strategies, with selectors compiled once per run.
#[derive(Debug)]
pub struct Cascade {
    base: Vec<CompiledSelector>,
    hints: Vec<CompiledHint>,
}

impl Cascade {
    /// Compile the base selectors and the configured domain hints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Selector`] if a domain hint carries invalid CSS.
    pub fn new(config: &HarvestConfig) -> Result<Self, ConfigError> {
        let base = BASE_SELECTORS
            .iter()
            .filter_map(|(css, attr)| CompiledSelector::compile(css, *attr))
            .collect();

        let mut hints = Vec::with_capacity(config.domain_hints.len());
        for hint in &config.domain_hints {
            let mut selectors = Vec::with_capacity(hint.selectors.len());
            for spec in &hint.selectors {
                let compiled = CompiledSelector::compile(&spec.css, spec.attr.as_deref())
                    .ok_or_else(|| ConfigError::Selector {
                        host: hint.host_contains.clone(),
                        selector: spec.css.clone(),
                    })?;
                selectors.push(compiled);
            }
            hints.push(CompiledHint {
                host_contains: hint.host_contains.to_lowercase(),
                selectors,
            });
        }

        Ok(Self { base, hints })
    }

    /// Run the cascade over `html`, fetched from `url`.
    ///
    /// # Arguments
    ///
    /// * `html` - The decoded document
    /// * `url` - Where it came from; only used to select domain hints, never
    ///   fetched or followed
    ///
    /// # Returns
    ///
    /// The first normalized date and the strategy that found it, or an
    /// absent date tagged [`DateSource::None`].
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub fn extract(&self, html: &str, url: &str) -> ExtractionResult {
        let document = Html::parse_document(html);
        let host = host_of(url);

        let hinted = self
            .hints
            .iter()
            .filter(|hint| {
                host.as_deref()
                    .is_some_and(|h| h.contains(hint.host_contains.as_str()))
            })
            .flat_map(|hint| hint.selectors.iter());

        if let Some(date) = meta::first_date(&document, hinted.chain(self.base.iter())) {
            debug!(%date, "Date found in metadata");
            return ExtractionResult::found(date, DateSource::Meta);
        }

        if let Some(date) = jsonld::find_date(&document) {
            debug!(%date, "Date found in JSON-LD");
            return ExtractionResult::found(date, DateSource::StructuredData);
        }

        let text = patterns::visible_text(&document);
        if let Some(date) = patterns::find_date(&text) {
            debug!(%date, "Date found in visible text");
            return ExtractionResult::found(date, DateSource::Text);
        }

        let from_script = document.select(&SCRIPT).find_map(|script| {
            let source: String = script.text().collect();
            patterns::find_date(&source)
        });
        if let Some(date) = from_script {
            debug!(%date, "Date found in inline script");
            return ExtractionResult::found(date, DateSource::Script);
        }

        debug!("No date found by any strategy");
        ExtractionResult::not_found()
    }

    /// Like [`Cascade::extract`], but a panic anywhere in parsing or
    /// extraction becomes an absent-date result carrying a note.
    pub fn extract_guarded(&self, html: &str, url: &str) -> ExtractionResult {
        match catch_unwind(AssertUnwindSafe(|| self.extract(html, url))) {
            Ok(result) => result,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(%url, %reason, "Extraction aborted");
                ExtractionResult::aborted(format!("extraction aborted: {reason}"))
            }
        }
    }
}

/// Lowercased host of `url`, if it parses.
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
}
