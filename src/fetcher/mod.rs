pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::Result;

/// Retrieves the raw feed document for a URL. One GET, no retries.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
