pub mod context;
pub mod error;

pub use context::AppContext;
pub use error::{BroadsheetError, FetchError, ParseError, Result, StoreError, SyncError};
