use std::sync::Arc;

use crate::app::error::Result;
use crate::bridge::QueryBridge;
use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::normalizer::Normalizer;
use crate::store::SqliteStore;
use crate::sync::SyncCoordinator;

pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub coordinator: SyncCoordinator<SqliteStore>,
    pub bridge: QueryBridge<SqliteStore>,
}

impl AppContext {
    pub fn new(config: &Config) -> Result<Self> {
        let db_path = config.db_path()?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(config, store)
    }

    pub fn in_memory(config: &Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(config, store)
    }

    fn with_store(config: &Config, store: Arc<SqliteStore>) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::with_options(
            &config.feed.user_agent,
            config.feed.timeout(),
        )?);

        let coordinator =
            SyncCoordinator::new(config.feed.url.clone(), fetcher, Normalizer::new(), store.clone());
        let bridge = QueryBridge::new(store.clone(), &coordinator);

        Ok(Self {
            store,
            coordinator,
            bridge,
        })
    }
}
