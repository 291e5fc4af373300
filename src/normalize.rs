//! Date string normalization.
//!
//! Pages publish dates in dozens of shapes: ISO-8601 timestamps with offsets,
//! numeric day/month orders, long and abbreviated English month names, and
//! dates buried inside longer strings ("Published 12 March 2024 at noon").
//! [`normalize_date`] reconciles all of them into the canonical `YYYY-MM-DD`
//! form, or returns `None` when no date can be recognised.
//!
//! # Resolution Order
//!
//! 1. ISO-8601 date or date-time (trailing `Z` treated as `+00:00`, fractional
//!    seconds before an offset ignored)
//! 2. strftime templates parsed by chrono against the whole trimmed string,
//!    in [`TEMPLATES`] order
//! 3. Embedded numeric `YYYY-M-D` (any of `-`, `/`, `.` as separator)
//! 4. Embedded month-name dates, long names before abbreviations
//!
//! The calendar date is always taken as written; no timezone conversion
//! happens, and the year is never inferred from a two-digit form.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

/// Long English month names, as a regex alternation.
pub const MONTHS_LONG: &str =
    "January|February|March|April|May|June|July|August|September|October|November|December";

/// Abbreviated English month names. `Sept` precedes `Sep` so the longer form wins.
pub const MONTHS_ABBR: &str = "Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sept|Sep|Oct|Nov|Dec";

/// ISO-8601 shapes, with and without a UTC offset. `%.f` also accepts no
/// fraction at all.
const ISO_FORMATS: [&str; 9] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
];

/// Whole-string templates, in the order they are tried.
///
/// Day-first numeric forms precede month-first ones, so an ambiguous
/// `03/04/2024` resolves to 3 April; `04/25/2024` only fits month-first.
/// `%b` and `%B` both accept long and abbreviated month names in any case.
pub const TEMPLATES: [&str; 18] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%m.%d.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%Y%m%d",
    "%d-%b-%Y",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%z",
];

// `Sept` and a trailing period are not understood by `%b`.
static MONTH_ABBR_CLEANUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(?P<sept>Sep)t\b|(?P<abbr>Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Oct|Nov|Dec))\.?",
    )
    .unwrap()
});

static EMBEDDED_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})\b").unwrap());

static EMBEDDED_MONTH_NAMES: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        Regex::new(&format!(
            r"(?i)\b(?P<d>\d{{1,2}})\s+(?P<m>{MONTHS_LONG})\s+(?P<y>\d{{4}})\b"
        ))
        .unwrap(),
        Regex::new(&format!(
            r"(?i)\b(?P<m>{MONTHS_LONG})\s+(?P<d>\d{{1,2}}),\s+(?P<y>\d{{4}})\b"
        ))
        .unwrap(),
        Regex::new(&format!(
            r"(?i)\b(?P<d>\d{{1,2}})\s+(?P<m>{MONTHS_ABBR})\.?\s+(?P<y>\d{{4}})\b"
        ))
        .unwrap(),
        Regex::new(&format!(
            r"(?i)\b(?P<m>{MONTHS_ABBR})\.?\s+(?P<d>\d{{1,2}}),\s+(?P<y>\d{{4}})\b"
        ))
        .unwrap(),
    ]
});

/// Normalize an arbitrary date-like string to `YYYY-MM-DD`.
///
/// Never panics on any input.
///
/// # Arguments
///
/// * `raw` - Candidate text from a meta tag, JSON-LD value, or page text
///
/// # Returns
///
/// The canonical date, or `None` when nothing in the input looks like a
/// valid calendar date with a four-digit year.
///
/// # Examples
///
/// ```
/// use pubdate_harvest::normalize::normalize_date;
///
/// assert_eq!(normalize_date("2023-05-11T10:00:00Z").as_deref(), Some("2023-05-11"));
/// assert_eq!(normalize_date("Sept. 4, 2021").as_deref(), Some("2021-09-04"));
/// assert_eq!(normalize_date("Updated 12 March 2024, 09:14").as_deref(), Some("2024-03-12"));
/// assert_eq!(normalize_date("yesterday"), None);
/// ```
pub fn normalize_date(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    parse_iso(s)
        .or_else(|| parse_template(s))
        .or_else(|| embedded_numeric(s))
        .or_else(|| embedded_month_name(s))
}

/// Map an English month name or abbreviation to its number (1-12).
///
/// Case-insensitive; a trailing period is ignored, so `"Sept."` yields 9.
pub fn month_number(name: &str) -> Option<u32> {
    let lower = name.trim().trim_end_matches('.').to_ascii_lowercase();
    let prefix = lower.get(..3)?;
    let n = match prefix {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

/// Parse `s` with one strftime format, keeping the calendar date as written.
///
/// Formats with `%z` go through [`DateTime`], formats with a time of day
/// through [`NaiveDateTime`], and date-only formats through [`NaiveDate`].
pub fn parse_with(s: &str, format: &str) -> Option<NaiveDate> {
    let date = if format.contains("%z") {
        DateTime::parse_from_str(s, format).ok()?.date_naive()
    } else if format.contains("%H") {
        NaiveDateTime::parse_from_str(s, format).ok()?.date()
    } else {
        NaiveDate::parse_from_str(s, format).ok()?
    };
    four_digit_year(date)
}

fn parse_iso(s: &str) -> Option<String> {
    let candidate = match s.strip_suffix('Z') {
        Some(head) => Cow::Owned(format!("{head}+00:00")),
        None => Cow::Borrowed(s),
    };
    ISO_FORMATS
        .iter()
        .find_map(|format| parse_with(&candidate, format))
        .map(canonical)
}

fn parse_template(s: &str) -> Option<String> {
    let collapsed = s.split_whitespace().join(" ");
    let cleaned = MONTH_ABBR_CLEANUP.replace_all(&collapsed, "$sept$abbr");
    TEMPLATES
        .iter()
        .find_map(|format| parse_with(&cleaned, format))
        .map(canonical)
}

fn embedded_numeric(s: &str) -> Option<String> {
    EMBEDDED_NUMERIC.captures_iter(s).find_map(|caps| {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        from_ymd(year, month, day)
    })
}

fn embedded_month_name(s: &str) -> Option<String> {
    EMBEDDED_MONTH_NAMES
        .iter()
        .find_map(|re| re.captures_iter(s).find_map(|caps| date_from_captures(&caps)))
}

fn date_from_captures(caps: &Captures<'_>) -> Option<String> {
    let year = caps.name("y")?.as_str().parse().ok()?;
    let month = month_number(caps.name("m")?.as_str())?;
    let day = caps.name("d")?.as_str().parse().ok()?;
    from_ymd(year, month, day)
}

fn from_ymd(year: i32, month: u32, day: u32) -> Option<String> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(four_digit_year)
        .map(canonical)
}

// `%Y` accepts one to four digits; short years are never expanded.
fn four_digit_year(date: NaiveDate) -> Option<NaiveDate> {
    (1000..=9999).contains(&date.year()).then_some(date)
}

fn canonical(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
