use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ASPECT_RATIO: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub server_id: String,
    pub title: String,
    pub author: String,
    pub body: String,
    pub thumbnail_url: String,
    pub photo_url: String,
    pub aspect_ratio: f64,
    /// `None` when the feed carried no usable date
    pub published_date: Option<DateTime<Utc>>,
}

impl ArticleRecord {
    pub fn new(server_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            title: String::new(),
            author: String::new(),
            body: String::new(),
            thumbnail_url: String::new(),
            photo_url: String::new(),
            aspect_ratio: DEFAULT_ASPECT_RATIO,
            published_date: None,
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }

    /// Display order: newest first, undated last, then by id.
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        match (self.published_date, other.published_date) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| self.server_id.cmp(&other.server_id))
    }
}

pub fn sort_for_display(records: &mut [ArticleRecord]) {
    records.sort_by(ArticleRecord::display_cmp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dated(id: &str, day: u32) -> ArticleRecord {
        let mut record = ArticleRecord::new(id);
        record.published_date = Some(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap());
        record
    }

    #[test]
    fn test_new_uses_defaults() {
        let record = ArticleRecord::new("42");
        assert_eq!(record.server_id, "42");
        assert_eq!(record.title, "");
        assert_eq!(record.aspect_ratio, 1.0);
        assert!(record.published_date.is_none());
    }

    #[test]
    fn test_display_title_without_title() {
        let record = ArticleRecord::new("1");
        assert_eq!(record.display_title(), "(Untitled)");
    }

    #[test]
    fn test_sort_newest_first_with_id_tiebreak() {
        let mut records = vec![
            dated("b", 1),
            ArticleRecord::new("undated"),
            dated("c", 3),
            dated("a", 1),
        ];
        sort_for_display(&mut records);

        let ids: Vec<&str> = records.iter().map(|r| r.server_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b", "undated"]);
    }
}
