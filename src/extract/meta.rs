//! Metadata strategy: `<meta>` tags and `<time>` elements.

use super::CompiledSelector;
use crate::normalize::normalize_date;
use scraper::{ElementRef, Html};
use tracing::trace;

/// Try `selectors` in order; the first selector whose first matching
/// element yields a normalizable value wins.
///
/// Only the first match of each selector is considered, so a page with many
/// `<time>` elements is judged by its earliest one.
pub fn first_date<'a>(
    document: &Html,
    selectors: impl IntoIterator<Item = &'a CompiledSelector>,
) -> Option<String> {
    for compiled in selectors {
        let Some(element) = document.select(&compiled.selector).next() else {
            continue;
        };
        let raw = match compiled.attr.as_deref() {
            Some(attr) => element.value().attr(attr).map(str::to_string),
            None => Some(element_text(element)),
        };
        let Some(raw) = raw else {
            continue;
        };
        trace!(%raw, "Candidate metadata value");
        if let Some(date) = normalize_date(&raw) {
            return Some(date);
        }
    }
    None
}

/// Text content with each fragment trimmed and joined by single spaces.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
