pub mod article;
pub mod event;
pub mod list;
pub mod snapshot;

pub use article::{sort_for_display, ArticleRecord, DEFAULT_ASPECT_RATIO};
pub use event::{FailureCause, RefreshReport, SyncEvent, SyncState};
pub use list::ArticleList;
pub use snapshot::SnapshotInfo;
