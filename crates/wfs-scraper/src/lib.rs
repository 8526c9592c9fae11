//! Concurrent fetch/extract/aggregate pipeline.
//!
//! One batch of URLs is scraped under a concurrency ceiling; per-page
//! word-frequency tables are memoized in a shared [`Cache`] so duplicate
//! URLs never trigger a second download, and completed results stream to a
//! single collector as they arrive.

mod cache;
mod config;
mod error;
mod fetcher;
mod scraper;

pub use cache::Cache;
pub use config::{OnError, ScraperConfig};
pub use error::ScrapeError;
pub use fetcher::{HttpFetcher, PageFetcher};
pub use scraper::{scrape, BatchReport, ScrapeResult, SharedTable, TaskFailure};

pub use anyhow;
