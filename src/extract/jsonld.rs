//! Structured-data strategy: JSON-LD `<script>` blocks.
//!
//! Each `application/ld+json` block is parsed into a [`serde_json::Value`]
//! and walked by [`scan`], which checks a fixed set of date keys on every
//! object it reaches. Only top-level arrays and `@graph` collections are
//! descended into; the walk stops at [`MAX_DEPTH`].

use super::SCRIPT;
use crate::normalize::normalize_date;
use scraper::Html;
use serde_json::Value;
use tracing::debug;

/// Date-bearing keys, most authoritative first.
pub const DATE_KEYS: [&str; 4] = ["datePublished", "dateCreated", "uploadDate", "dateModified"];

/// Key of the nested node collection in a JSON-LD graph document.
pub const GRAPH_KEY: &str = "@graph";

pub const MAX_DEPTH: usize = 32;

const LD_JSON: &str = "application/ld+json";

/// First date found across all JSON-LD blocks in document order.
pub fn find_date(document: &Html) -> Option<String> {
    for script in document.select(&SCRIPT) {
        let is_ld_json = script
            .value()
            .attr("type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case(LD_JSON));
        if !is_ld_json {
            continue;
        }

        let body: String = script.text().collect();
        if body.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(value) => {
                if let Some(date) = scan(&value, 0) {
                    return Some(date);
                }
            }
            Err(e) => debug!(error = %e, "Skipping malformed JSON-LD block"),
        }
    }
    None
}

/// Recursively look for a normalizable date under one of [`DATE_KEYS`].
pub fn scan(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_DEPTH {
        return None;
    }
    match value {
        Value::Object(map) => {
            let direct = DATE_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(scalar_date);
            if direct.is_some() {
                return direct;
            }
            match map.get(GRAPH_KEY) {
                Some(Value::Array(items)) => items.iter().find_map(|item| scan(item, depth + 1)),
                _ => None,
            }
        }
        Value::Array(items) => items.iter().find_map(|item| scan(item, depth + 1)),
        _ => None,
    }
}

// Some publishers emit numbers (20240312) or single-element arrays.
fn scalar_date(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => normalize_date(s),
        Value::Number(n) => normalize_date(&n.to_string()),
        Value::Array(items) => items.iter().find_map(|item| match item {
            Value::String(s) => normalize_date(s),
            _ => None,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_priority() {
        let value = json!({
            "dateModified": "2024-01-02",
            "datePublished": "2023-12-01T09:00:00Z"
        });
        assert_eq!(scan(&value, 0).as_deref(), Some("2023-12-01"));
    }

    #[test]
    fn test_invalid_value_falls_to_next_key() {
        let value = json!({
            "datePublished": "unknown",
            "uploadDate": "2021-06-07"
        });
        assert_eq!(scan(&value, 0).as_deref(), Some("2021-06-07"));
    }

    #[test]
    fn test_graph_and_top_level_array() {
        let graph = json!({"@graph": [{"@type": "Organization"}, {"dateCreated": "2020/5/6"}]});
        assert_eq!(scan(&graph, 0).as_deref(), Some("2020-05-06"));

        let list = json!([{"name": "x"}, {"datePublished": "March 9, 2019"}]);
        assert_eq!(scan(&list, 0).as_deref(), Some("2019-03-09"));
    }

    #[test]
    fn test_other_nested_objects_are_not_searched() {
        let value = json!({"mainEntity": {"datePublished": "2020-01-01"}});
        assert_eq!(scan(&value, 0), None);
    }

    #[test]
    fn test_numeric_and_array_values() {
        assert_eq!(
            scan(&json!({"datePublished": 20240312}), 0).as_deref(),
            Some("2024-03-12")
        );
        assert_eq!(
            scan(&json!({"datePublished": ["2018-02-03"]}), 0).as_deref(),
            Some("2018-02-03")
        );
    }

    #[test]
    fn test_depth_guard() {
        let mut value = json!({"datePublished": "2020-01-01"});
        for _ in 0..(MAX_DEPTH + 5) {
            value = json!([value]);
        }
        assert_eq!(scan(&value, 0), None);

        let mut shallow = json!({"datePublished": "2020-01-01"});
        for _ in 0..3 {
            shallow = json!({"@graph": [shallow]});
        }
        assert_eq!(scan(&shallow, 0).as_deref(), Some("2020-01-01"));
    }

    #[test]
    fn test_find_date_skips_malformed_blocks() {
        let document = Html::parse_document(
            r#"<script type="application/ld+json">{"datePublished": </script>
               <script type=" Application/LD+JSON ">{"datePublished":"2016-10-10"}</script>"#,
        );
        assert_eq!(find_date(&document).as_deref(), Some("2016-10-10"));
    }

    #[test]
    fn test_find_date_ignores_other_script_types() {
        let document = Html::parse_document(
            r#"<script type="application/json">{"datePublished":"2016-10-10"}</script>"#,
        );
        assert_eq!(find_date(&document), None);
    }
}
