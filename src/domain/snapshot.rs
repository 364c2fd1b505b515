use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::ArticleRecord;

/// Metadata describing the stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub refreshed_at: DateTime<Utc>,
    pub article_count: usize,
    pub digest: String,
}

impl SnapshotInfo {
    /// Hex SHA-256 over the records as serialized, in the order given.
    ///
    /// Callers pass records in display order so equal snapshots hash equal.
    pub fn digest_of(records: &[ArticleRecord]) -> String {
        let mut hasher = Sha256::new();
        for record in records {
            // Serializing a plain struct of strings and numbers cannot fail
            if let Ok(bytes) = serde_json::to_vec(record) {
                hasher.update(&bytes);
            }
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }

    pub fn short_digest(&self) -> &str {
        &self.digest[..self.digest.len().min(12)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_deterministic() {
        let records = vec![ArticleRecord::new("1"), ArticleRecord::new("2")];
        assert_eq!(
            SnapshotInfo::digest_of(&records),
            SnapshotInfo::digest_of(&records.clone())
        );
    }

    #[test]
    fn test_digest_changes_with_content() {
        let a = vec![ArticleRecord::new("1")];
        let mut changed = ArticleRecord::new("1");
        changed.title = "Edited".into();
        assert_ne!(
            SnapshotInfo::digest_of(&a),
            SnapshotInfo::digest_of(&[changed])
        );
    }

    #[test]
    fn test_digest_is_hex_sha256() {
        let digest = SnapshotInfo::digest_of(&[]);
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
