use std::cmp;
use std::sync::Arc;

use futures::{future, stream, Future, StreamExt};
use tokio::sync::mpsc;
use wfs_extract::{extract, HtmlScanner, WordCount, WordFrequencyTable};

use crate::cache::{Cache, Inflight};
use crate::config::{OnError, ScraperConfig};
use crate::error::ScrapeError;
use crate::fetcher::PageFetcher;

/// A completed table, shared between the cache and the result stream
/// without copying.
pub type SharedTable = Arc<WordFrequencyTable>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeResult {
    pub url: String,
    pub table: SharedTable,
}

#[derive(Debug)]
pub struct TaskFailure {
    pub url: String,
    pub error: ScrapeError,
}

/// Outcome of one batch: results in arrival (completion) order, plus the
/// per-URL failures recorded under [`OnError::SkipAndLog`].
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<ScrapeResult>,
    pub failures: Vec<TaskFailure>,
}

/// Scrapes one batch of URLs and waits for every result to be collected.
///
/// One task runs per URL, at most `max_concurrency` concurrently. Each task
/// checks the cache, coalesces concurrent fetches of the same URL, extracts
/// a word-frequency table on a miss, and pushes its result onto the stream
/// drained by a single collector task. The collector memoizes every result
/// in `cache` before emitting it, so duplicate URLs (within a batch or
/// across batches over an injected cache) never fetch twice.
///
/// Under [`OnError::Fail`] the first task error stops dispatch (tasks not
/// yet started never run, in-flight ones are cancelled) and becomes the
/// batch outcome; under [`OnError::SkipAndLog`] every task runs and
/// failures are reported in the [`BatchReport`]. Either way this returns
/// only after the collector has drained the closed result stream.
pub async fn scrape<F>(
    config: &ScraperConfig,
    fetcher: &F,
    cache: Arc<Cache<SharedTable>>,
    urls: &[String],
) -> Result<BatchReport, ScrapeError>
where
    F: PageFetcher,
{
    let (tx_result, rx_result) = mpsc::unbounded_channel::<ScrapeResult>();
    let inflight: Inflight<SharedTable> = Inflight::new();

    // Collector: the only consumer. Stops once every task-side sender is
    // dropped, which is the "stream closed" signal.
    let collector = {
        let cache = cache.clone();
        let excerpt_words = config.excerpt_words;
        tokio::spawn(async move {
            let mut rx_result = rx_result;
            let mut results = Vec::new();
            while let Some(result) = rx_result.recv().await {
                cache.set(&result.url, result.table.clone());
                log::info!("done {} {}", result.url, excerpt(&result.table, excerpt_words));
                results.push(result);
            }
            results
        })
    };

    // Dispatcher: one task per URL, bounded concurrency.
    let tasks = stream::iter(urls.iter().cloned())
        .map(|url| {
            let tx_result = tx_result.clone();
            let inflight = &inflight;
            let cache = cache.as_ref();
            async move { scrape_url(fetcher, cache, inflight, &tx_result, url).await }
        })
        .buffer_unordered(cmp::max(1, config.max_concurrency));

    let outcome: Result<Vec<TaskFailure>, TaskFailure> = match config.on_task_error {
        OnError::Fail => {
            let mut err = Ok::<(), TaskFailure>(());
            tasks.scan(&mut err, until_err).collect::<Vec<_>>().await;
            err.map(|()| Vec::new())
        }
        OnError::SkipAndLog => Ok(tasks
            .filter_map(|done| async move {
                done.map_err(|failure| {
                    log::warn!("skipping {}: {}", failure.url, failure.error);
                    failure
                })
                .err()
            })
            .collect()
            .await),
    };

    // All tasks have settled; closing the stream lets the collector finish.
    drop(tx_result);
    let results = collector
        .await
        .map_err(|e| ScrapeError::Concurrency(format!("result collector died: {e}")))?;

    let failures = match outcome {
        Ok(failures) => failures,
        Err(first) => return Err(first.error),
    };

    Ok(BatchReport { results, failures })
}

async fn scrape_url<F>(
    fetcher: &F,
    cache: &Cache<SharedTable>,
    inflight: &Inflight<SharedTable>,
    tx_result: &mpsc::UnboundedSender<ScrapeResult>,
    url: String,
) -> Result<(), TaskFailure>
where
    F: PageFetcher,
{
    if let Some(table) = cache.get(&url) {
        log::debug!("from cache {url}");
        send_result(tx_result, ScrapeResult { url, table });
        return Ok(());
    }

    let cell = inflight.cell(&url);
    let table = cell
        .get_or_try_init(|| async {
            log::debug!("requesting {url}");
            let page = fetcher.fetch(&url).await?;
            let mut scanner = HtmlScanner::new(&page);
            let table = extract(&mut scanner).map_err(|source| ScrapeError::Scan {
                url: url.clone(),
                source,
            })?;
            Ok::<_, ScrapeError>(Arc::new(table))
        })
        .await
        .map_err(|error| TaskFailure {
            url: url.clone(),
            error,
        })?
        .clone();

    send_result(tx_result, ScrapeResult { url, table });
    Ok(())
}

fn send_result(tx_result: &mpsc::UnboundedSender<ScrapeResult>, result: ScrapeResult) {
    if let Err(e) = tx_result.send(result) {
        // Only possible if the collector is gone, which scrape() surfaces
        // as a Concurrency error when joining it.
        log::error!("result stream closed early: {e}");
    }
}

fn until_err<T, E>(
    err: &mut &mut Result<(), E>,
    item: Result<T, E>,
) -> impl Future<Output = Option<T>> {
    match item {
        Ok(item) => future::ready(Some(item)),
        Err(e) => {
            **err = Err(e);
            future::ready(None)
        }
    }
}

/// Top-N highest counts, i.e. the tail of the ascending table.
fn excerpt(table: &[WordCount], n: usize) -> String {
    table
        .iter()
        .rev()
        .take(n)
        .map(|wc| format!("{}:{}", wc.word, wc.count))
        .collect::<Vec<_>>()
        .join(" ")
}
