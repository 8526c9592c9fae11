use std::io::prelude::*;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};

use crate::config::ScraperConfig;
use crate::error::ScrapeError;

/// Downloads one page as text.
///
/// Implementations own transport concerns (pooling, TLS, timeouts); the
/// pipeline treats any failure uniformly as a task error.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;
}

/// [`PageFetcher`] over a shared reqwest client with a per-request timeout
/// and transparent decompression of gzip-typed bodies.
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(config: &ScraperConfig) -> anyhow::Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .gzip(true)
            .deflate(true)
            .timeout(config.fetch_timeout())
            .build()?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let fetch_err = |e: &dyn std::fmt::Display| ScrapeError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| fetch_err(&e))?
            .error_for_status()
            .map_err(|e| fetch_err(&e))?;

        let page = match resp.headers().get(CONTENT_TYPE) {
            Some(c) if c == "application/x-gzip" || c == "application/gzip" => {
                let compressed = resp.bytes().await.map_err(|e| fetch_err(&e))?;
                let mut gz = GzDecoder::new(&compressed[..]);
                let mut page = String::new();
                gz.read_to_string(&mut page).map_err(|e| fetch_err(&e))?;
                page
            }
            _ => resp.text().await.map_err(|e| fetch_err(&e))?,
        };

        Ok(page)
    }
}
