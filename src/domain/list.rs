use std::ops::Deref;
use std::sync::Arc;

use crate::domain::ArticleRecord;

/// Immutable, randomly-addressable query result.
///
/// Cloning is cheap; every subscriber of a change notification can hold the
/// same list without copying records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleList {
    records: Arc<[ArticleRecord]>,
}

impl ArticleList {
    pub fn new(records: Vec<ArticleRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }

    pub fn position_of(&self, server_id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.server_id == server_id)
    }
}

impl From<Vec<ArticleRecord>> for ArticleList {
    fn from(records: Vec<ArticleRecord>) -> Self {
        Self::new(records)
    }
}

impl Deref for ArticleList {
    type Target = [ArticleRecord];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}
