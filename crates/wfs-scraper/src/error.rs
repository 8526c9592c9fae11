use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network failure, timeout, or non-2xx status while downloading a page.
    /// Task-local: never brings down the batch under [`OnError::SkipAndLog`].
    ///
    /// [`OnError::SkipAndLog`]: crate::OnError::SkipAndLog
    #[error("fetching {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The markup scanner reported a malformed token stream.
    #[error("scanning {url}: {source}")]
    Scan {
        url: String,
        #[source]
        source: wfs_extract::ScanError,
    },

    /// A pipeline invariant broke (e.g. the collector died mid-batch).
    /// Always fatal for the batch, regardless of error policy.
    #[error("concurrency failure: {0}")]
    Concurrency(String),
}
