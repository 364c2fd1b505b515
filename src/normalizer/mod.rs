use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use html_escape::decode_html_entities;
use serde_json::{Map, Value};

use crate::app::ParseError;
use crate::domain::{ArticleRecord, DEFAULT_ASPECT_RATIO};

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Records in document order plus the number of entries dropped for a
/// missing or duplicate id.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<ArticleRecord>,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, body: &[u8]) -> Result<Normalized, ParseError> {
        let document: Value = serde_json::from_slice(body)
            .map_err(|e| ParseError::MalformedDocument(e.to_string()))?;

        let Value::Array(entries) = document else {
            return Err(ParseError::MalformedDocument(format!(
                "expected a JSON array, found {}",
                kind_of(&document)
            )));
        };

        let mut seen = HashSet::with_capacity(entries.len());
        let mut normalized = Normalized {
            records: Vec::with_capacity(entries.len()),
            skipped: 0,
        };

        for (index, entry) in entries.iter().enumerate() {
            let Some(record) = entry.as_object().and_then(normalize_entry) else {
                tracing::debug!("Skipping feed entry {} without a usable id", index);
                normalized.skipped += 1;
                continue;
            };

            if !seen.insert(record.server_id.clone()) {
                tracing::debug!(
                    "Skipping feed entry {} with duplicate id {}",
                    index,
                    record.server_id
                );
                normalized.skipped += 1;
                continue;
            }

            normalized.records.push(record);
        }

        Ok(normalized)
    }
}

fn normalize_entry(entry: &Map<String, Value>) -> Option<ArticleRecord> {
    let server_id = match entry.get("id")? {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        _ => return None,
    };

    let mut record = ArticleRecord::new(server_id);
    record.title = decoded_text(entry, "title");
    record.author = decoded_text(entry, "author");
    record.body = decoded_text(entry, "body");
    record.thumbnail_url = text(entry, "thumb");
    record.photo_url = text(entry, "photo");
    record.aspect_ratio = aspect_ratio(entry.get("aspect_ratio"));
    record.published_date = entry.get("published_date").and_then(parse_published_date);

    Some(record)
}

fn text(entry: &Map<String, Value>, key: &str) -> String {
    entry
        .get(key)
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_default()
}

fn decoded_text(entry: &Map<String, Value>, key: &str) -> String {
    entry
        .get(key)
        .and_then(Value::as_str)
        .map(|s| decode_html_entities(s).to_string())
        .unwrap_or_default()
}

fn aspect_ratio(value: Option<&Value>) -> f64 {
    let ratio = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    ratio
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or(DEFAULT_ASPECT_RATIO)
}

/// Accepts RFC 3339, offset-less ISO-8601 (as UTC), bare dates, and epoch
/// milliseconds. Truncated to millisecond precision.
fn parse_published_date(value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(s) => parse_date_str(s.trim()),
        _ => None,
    }?;

    DateTime::from_timestamp_millis(parsed.timestamp_millis())
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    let digits = s.strip_prefix('-').unwrap_or(s);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis);
    }

    None
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FEED_SAMPLE: &str = r#"[
      {
        "id": "1",
        "title": "Uncle Tom&#39;s Cabin",
        "author": "Harriet Beecher Stowe",
        "body": "It was late in the afternoon &amp; cold.",
        "thumb": "https://example.com/thumbs/1.jpg",
        "photo": "https://example.com/photos/1.jpg",
        "aspect_ratio": 1.4957,
        "published_date": "2013-06-20T00:00:00.000Z"
      },
      {
        "id": "2",
        "title": "Pride and Prejudice",
        "author": "Jane Austen",
        "body": "It is a truth universally acknowledged.",
        "thumb": "https://example.com/thumbs/2.jpg",
        "photo": "https://example.com/photos/2.jpg",
        "aspect_ratio": 0.66667,
        "published_date": "1361862000000",
        "unknown_key": true
      }
    ]"#;

    fn normalize(json: &str) -> Normalized {
        Normalizer::new().normalize(json.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_feed() {
        let normalized = normalize(FEED_SAMPLE);

        assert_eq!(normalized.skipped, 0);
        assert_eq!(normalized.records.len(), 2);

        let first = &normalized.records[0];
        assert_eq!(first.server_id, "1");
        assert_eq!(first.title, "Uncle Tom's Cabin");
        assert_eq!(first.body, "It was late in the afternoon & cold.");
        assert_eq!(first.thumbnail_url, "https://example.com/thumbs/1.jpg");
        assert_eq!(first.photo_url, "https://example.com/photos/1.jpg");
        assert_eq!(first.aspect_ratio, 1.4957);
        assert_eq!(
            first.published_date,
            Some(Utc.with_ymd_and_hms(2013, 6, 20, 0, 0, 0).unwrap())
        );

        let second = &normalized.records[1];
        assert_eq!(
            second.published_date,
            DateTime::from_timestamp_millis(1_361_862_000_000)
        );
    }

    #[test]
    fn test_document_order_preserved() {
        let normalized = normalize(r#"[{"id": "z"}, {"id": "a"}, {"id": "m"}]"#);
        let ids: Vec<&str> = normalized
            .records
            .iter()
            .map(|r| r.server_id.as_str())
            .collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_missing_id_skipped() {
        let normalized = normalize(
            r#"[
              {"title": "no id"},
              {"id": "1"}, {"id": "2"}, {"id": "3"}, {"id": "4"}
            ]"#,
        );
        assert_eq!(normalized.skipped, 1);
        assert_eq!(normalized.records.len(), 4);
    }

    #[test]
    fn test_unusable_ids_skipped() {
        let normalized = normalize(
            r#"[
              {"id": null}, {"id": ""}, {"id": "   "}, {"id": 1.5},
              {"id": ["x"]}, "not an object", 7, {"id": "ok"}
            ]"#,
        );
        assert_eq!(normalized.skipped, 7);
        assert_eq!(normalized.records.len(), 1);
    }

    #[test]
    fn test_numeric_id_accepted() {
        let normalized = normalize(r#"[{"id": 17}]"#);
        assert_eq!(normalized.records[0].server_id, "17");
    }

    #[test]
    fn test_duplicate_id_first_wins() {
        let normalized = normalize(
            r#"[{"id": "1", "title": "first"}, {"id": "1", "title": "second"}, {"id": "2"}]"#,
        );
        assert_eq!(normalized.skipped, 1);
        assert_eq!(normalized.records.len(), 2);
        assert_eq!(normalized.records[0].title, "first");
    }

    #[test]
    fn test_bad_fields_fall_back_to_defaults() {
        let normalized = normalize(
            r#"[{
              "id": "1",
              "title": 42,
              "author": null,
              "thumb": false,
              "aspect_ratio": -2,
              "published_date": "sometime last week"
            }]"#,
        );

        assert_eq!(normalized.skipped, 0);
        let record = &normalized.records[0];
        assert_eq!(record.title, "");
        assert_eq!(record.author, "");
        assert_eq!(record.body, "");
        assert_eq!(record.thumbnail_url, "");
        assert_eq!(record.aspect_ratio, 1.0);
        assert!(record.published_date.is_none());
    }

    #[test]
    fn test_aspect_ratio_variants() {
        assert_eq!(aspect_ratio(None), 1.0);
        assert_eq!(aspect_ratio(Some(&Value::from(0.0))), 1.0);
        assert_eq!(aspect_ratio(Some(&Value::from("1.5"))), 1.5);
        assert_eq!(aspect_ratio(Some(&Value::from("wide"))), 1.0);
        assert_eq!(aspect_ratio(Some(&Value::from(2))), 2.0);
    }

    #[test]
    fn test_date_formats() {
        let expected = Utc.with_ymd_and_hms(2014, 3, 1, 12, 30, 0).unwrap();

        assert_eq!(parse_date_str("2014-03-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_date_str("2014-03-01T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_date_str("2014-03-01T12:30:00.000"), Some(expected));
        assert_eq!(parse_date_str("2014-03-01 12:30:00"), Some(expected));
        assert_eq!(
            parse_date_str("2014-03-01"),
            Some(Utc.with_ymd_and_hms(2014, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_date_str(&expected.timestamp_millis().to_string()),
            Some(expected)
        );
        assert_eq!(parse_date_str("12:30 March 1st"), None);
        assert_eq!(parse_date_str(""), None);
    }

    #[test]
    fn test_epoch_millis_number() {
        let value = Value::from(1_361_862_000_000i64);
        assert_eq!(
            parse_published_date(&value),
            DateTime::from_timestamp_millis(1_361_862_000_000)
        );
    }

    #[test]
    fn test_date_truncated_to_millis() {
        let value = Value::from("2014-03-01T12:30:00.123456789Z");
        let parsed = parse_published_date(&value).unwrap();
        assert_eq!(parsed.timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn test_top_level_object_is_malformed() {
        let result = Normalizer::new().normalize(br#"{"id": "1"}"#);
        assert!(matches!(result, Err(ParseError::MalformedDocument(_))));
    }

    #[test]
    fn test_syntax_error_is_malformed() {
        let result = Normalizer::new().normalize(br#"[{"id": "1"},"#);
        assert!(matches!(result, Err(ParseError::MalformedDocument(_))));
    }

    #[test]
    fn test_empty_array() {
        let normalized = normalize("[]");
        assert!(normalized.records.is_empty());
        assert_eq!(normalized.skipped, 0);
    }
}
