//! Free-text strategies: visible page text and inline script source.
//!
//! Both strategies search with the same four patterns, most specific first:
//! `Month D, YYYY`, `D Month YYYY`, `YYYY-M-D`, then `M/D/YYYY`. The first
//! match the normalizer accepts wins.

use crate::normalize::{MONTHS_LONG, normalize_date};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

static TEXT_PATTERNS: Lazy<[Regex; 4]> = Lazy::new(|| {
    [
        Regex::new(&format!(r"\b(?:{MONTHS_LONG})\s+\d{{1,2}},\s+\d{{4}}\b")).unwrap(),
        Regex::new(&format!(r"\b\d{{1,2}}\s+(?:{MONTHS_LONG})\s+\d{{4}}\b")).unwrap(),
        Regex::new(r"\b\d{4}-\d{1,2}-\d{1,2}\b").unwrap(),
        Regex::new(r"\b\d{1,2}/\d{1,2}/\d{4}\b").unwrap(),
    ]
});

/// Elements whose text a reader never sees.
const HIDDEN_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Search `text` for the first recognizable date.
pub fn find_date(text: &str) -> Option<String> {
    TEXT_PATTERNS.iter().find_map(|re| {
        re.find_iter(text)
            .find_map(|m| normalize_date(m.as_str()))
    })
}

/// All human-visible text of the document, collapsed to single spaces.
pub fn visible_text(document: &Html) -> String {
    let mut fragments: Vec<&str> = Vec::new();
    for node in document.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_TAGS.contains(&el.name()))
        });
        if !hidden {
            fragments.push(text);
        }
    }
    fragments
        .iter()
        .flat_map(|f| f.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_order() {
        let text = "See 2019-04-01 and 5 June 2020 and July 4, 2021";
        assert_eq!(find_date(text).as_deref(), Some("2021-07-04"));
    }

    #[test]
    fn test_day_month_year() {
        assert_eq!(
            find_date("The claim surfaced on 12 March 2024 online").as_deref(),
            Some("2024-03-12")
        );
    }

    #[test]
    fn test_slash_dates_are_day_first_when_ambiguous() {
        assert_eq!(find_date("posted 03/04/2024").as_deref(), Some("2024-04-03"));
        assert_eq!(find_date("posted 04/25/2024").as_deref(), Some("2024-04-25"));
    }

    #[test]
    fn test_invalid_match_tries_next() {
        assert_eq!(
            find_date("version 2024-99-99, date 2023-01-31").as_deref(),
            Some("2023-01-31")
        );
    }

    #[test]
    fn test_no_date() {
        assert_eq!(find_date("nothing to see here 12345"), None);
    }

    #[test]
    fn test_visible_text_skips_hidden_elements() {
        let document = Html::parse_document(
            "<html><head><title>T</title><style>p { color: red }</style></head>\
             <body><p>Hello\n\n   world</p><script>var d = '2020-01-01';</script>\
             <noscript>2021-01-01</noscript></body></html>",
        );
        assert_eq!(visible_text(&document), "T Hello world");
    }
}
