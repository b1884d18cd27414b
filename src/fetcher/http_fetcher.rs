use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::app::{Result, TributaryError};
use crate::config::FetchConfig;
use crate::fetcher::Fetcher;

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.clone())
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(&FetchConfig::default())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        // A non-2xx body is never handed to the parser; an error page
        // must surface as a status error, not as malformed XML.
        let status = response.status();
        if !status.is_success() {
            return Err(TributaryError::HttpStatus {
                status,
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?.to_vec();
        Ok(body)
    }
}
