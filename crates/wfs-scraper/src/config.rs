use std::cmp;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-page download timeout in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Maximum number of concurrently running page tasks.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_on_task_error")]
    pub on_task_error: OnError,

    /// Number of top words logged per completed page.
    #[serde(default = "default_excerpt_words")]
    pub excerpt_words: usize,
}

impl ScraperConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_concurrency: default_max_concurrency(),
            on_task_error: default_on_task_error(),
            excerpt_words: default_excerpt_words(),
        }
    }
}

fn default_user_agent() -> String {
    String::from("WFSbot")
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_max_concurrency() -> usize {
    cmp::max(1, num_cpus::get())
}

fn default_on_task_error() -> OnError {
    OnError::SkipAndLog
}

fn default_excerpt_words() -> usize {
    5
}

/// Batch-level error policy: `Fail` aborts on the first task error,
/// `SkipAndLog` lets every task run and reports failures per URL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ArgEnum))]
pub enum OnError {
    Fail,
    SkipAndLog,
}
