pub mod sqlite;

use tokio::sync::watch;

use crate::app::StoreError;
use crate::domain::{ArticleList, ArticleRecord, SnapshotInfo};

pub use sqlite::SqliteStore;

pub trait Store {
    /// Atomically swap the whole snapshot. On error the previous snapshot
    /// is left untouched.
    fn replace_all(&self, records: &[ArticleRecord]) -> Result<SnapshotInfo, StoreError>;

    /// Newest first, undated last, ties by `server_id` ascending.
    fn query_all(&self) -> Result<ArticleList, StoreError>;

    fn query_by_id(&self, server_id: &str) -> Result<Option<ArticleRecord>, StoreError>;

    fn snapshot_info(&self) -> Result<Option<SnapshotInfo>, StoreError>;

    /// Generation counter bumped after every committed `replace_all`.
    fn changes(&self) -> watch::Receiver<u64>;
}
