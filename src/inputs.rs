//! Loading the URL list from a CSV file.
//!
//! The file is decoded as UTF-8 (a leading BOM is dropped) and falls back to
//! Latin-1 when that fails, since spreadsheet exports of fact-check lists are
//! often not UTF-8. Headers are matched after trimming and lowercasing; the
//! leftmost column whose name appears in [`URL_COLUMNS`] supplies the URLs.

use crate::error::InputError;
use csv::{ReaderBuilder, Trim};
use itertools::Itertools;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Header names recognised as holding URLs.
pub const URL_COLUMNS: [&str; 5] = ["url", "link", "source", "source_url", "article_url"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Read `path` and return its URLs: trimmed, non-empty, de-duplicated with
/// first occurrences kept in file order.
///
/// # Arguments
///
/// * `path` - CSV file with a header row
///
/// # Returns
///
/// The URLs from the leftmost URL-like column.
///
/// # Errors
///
/// [`InputError`] if the file cannot be read, has no URL-like column, or
/// yields no URLs. Malformed rows are skipped, not reported.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_urls(path: impl AsRef<Path>) -> Result<Vec<String>, InputError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let bytes = fs::read(path).await.map_err(|source| InputError::Read {
        path: display.clone(),
        source,
    })?;

    let urls = parse_urls(&decode(&bytes), &display)?;
    if urls.is_empty() {
        return Err(InputError::Empty { path: display });
    }
    info!(count = urls.len(), "Loaded URLs");
    Ok(urls)
}

/// Decode file contents, preferring UTF-8 and falling back to Latin-1.
pub fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            warn!("Input is not valid UTF-8; decoding as Latin-1");
            bytes.iter().map(|&b| char::from(b)).collect()
        }
    }
}

/// Extract the URL column from already-decoded CSV text.
pub fn parse_urls(text: &str, path: &str) -> Result<Vec<String>, InputError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(|source| InputError::Header {
        path: path.to_string(),
        source,
    })?;
    let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

    let column = normalized
        .iter()
        .position(|h| URL_COLUMNS.contains(&h.as_str()))
        .ok_or_else(|| InputError::NoUrlColumn {
            path: path.to_string(),
            expected: URL_COLUMNS.join(", "),
        })?;

    let mut skipped = 0usize;
    let urls = reader
        .records()
        .filter_map(|row| match row {
            Ok(record) => record.get(column).map(|v| v.trim().to_string()),
            Err(e) => {
                skipped += 1;
                warn!(error = %e, "Skipping malformed CSV row");
                None
            }
        })
        .filter(|url| !url.is_empty())
        .unique()
        .collect_vec();

    if skipped > 0 {
        warn!(skipped, "Some CSV rows could not be read");
    }
    Ok(urls)
}
