pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::FetchError;

pub use http_fetcher::HttpFetcher;

/// Retrieves the raw feed document. No caching, no retries.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
