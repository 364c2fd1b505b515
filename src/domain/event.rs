use std::fmt;

use crate::app::SyncError;
use crate::domain::SnapshotInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Refreshing,
    Succeeded,
    Failed,
}

/// Tag identifying what broke a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    Connection,
    Status(u16),
    Truncated,
    MalformedDocument,
    PersistenceFault,
    Interrupted,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Connection => write!(f, "connection"),
            FailureCause::Status(code) => write!(f, "status {}", code),
            FailureCause::Truncated => write!(f, "truncated"),
            FailureCause::MalformedDocument => write!(f, "malformed document"),
            FailureCause::PersistenceFault => write!(f, "persistence fault"),
            FailureCause::Interrupted => write!(f, "interrupted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub stored: usize,
    /// Feed entries dropped for a missing or duplicate id
    pub skipped: usize,
    pub snapshot: SnapshotInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Refreshing,
    Succeeded(RefreshReport),
    Failed(SyncError),
}

impl SyncEvent {
    pub fn state(&self) -> SyncState {
        match self {
            SyncEvent::Refreshing => SyncState::Refreshing,
            SyncEvent::Succeeded(_) => SyncState::Succeeded,
            SyncEvent::Failed(_) => SyncState::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SyncEvent::Refreshing)
    }
}
