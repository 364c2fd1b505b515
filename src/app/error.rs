use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::FailureCause;

/// Transport failure while retrieving the feed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Response body truncated: {0}")]
    Truncated(String),
}

/// The feed document as a whole could not be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed feed document: {0}")]
    MalformedDocument(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Persistence fault: {0}")]
    Persistence(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Persistence(e.to_string())
    }
}

impl From<rusqlite_migration::Error> for StoreError {
    fn from(e: rusqlite_migration::Error) -> Self {
        StoreError::Persistence(format!("migration failed: {}", e))
    }
}

/// Why a refresh cycle failed. Shared by every caller that joined the cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Refresh cycle interrupted: {0}")]
    Interrupted(String),
}

impl SyncError {
    pub fn cause(&self) -> FailureCause {
        match self {
            SyncError::Fetch(FetchError::Connection(_)) => FailureCause::Connection,
            SyncError::Fetch(FetchError::Status(code)) => FailureCause::Status(*code),
            SyncError::Fetch(FetchError::Truncated(_)) => FailureCause::Truncated,
            SyncError::Parse(ParseError::MalformedDocument(_)) => FailureCause::MalformedDocument,
            SyncError::Store(StoreError::Persistence(_)) => FailureCause::PersistenceFault,
            SyncError::Interrupted(_) => FailureCause::Interrupted,
        }
    }
}

#[derive(Error, Debug)]
pub enum BroadsheetError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Refresh failed: {0}")]
    Sync(#[from] SyncError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Article not found: {0}")]
    ArticleNotFound(String),
}

pub type Result<T> = std::result::Result<T, BroadsheetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_tags() {
        assert_eq!(
            SyncError::from(FetchError::Connection("refused".into())).cause(),
            FailureCause::Connection
        );
        assert_eq!(
            SyncError::from(FetchError::Status(503)).cause(),
            FailureCause::Status(503)
        );
        assert_eq!(
            SyncError::from(ParseError::MalformedDocument("eof".into())).cause(),
            FailureCause::MalformedDocument
        );
        assert_eq!(
            SyncError::from(StoreError::Persistence("disk full".into())).cause(),
            FailureCause::PersistenceFault
        );
    }

    #[test]
    fn test_sync_error_displays_inner_error() {
        let err = SyncError::from(FetchError::Status(404));
        assert_eq!(err.to_string(), "HTTP status 404");
    }
}
