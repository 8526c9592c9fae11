use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use wfs_scraper::{
    scrape, Cache, OnError, PageFetcher, ScrapeError, ScraperConfig, SharedTable,
};

/// Scripted fetcher that counts per-URL calls and tracks the peak number of
/// concurrently in-flight fetches.
struct FakeFetcher {
    pages: HashMap<String, Result<String, String>>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    delay: Duration,
}

impl FakeFetcher {
    fn new(pages: Vec<(&str, Result<&str, &str>)>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(url, page)| {
                    (
                        url.to_string(),
                        page.map(str::to_string).map_err(str::to_string),
                    )
                })
                .collect(),
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            delay: Duration::from_millis(10),
        }
    }

    fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn peak(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.pages.get(url) {
            Some(Ok(page)) => Ok(page.clone()),
            Some(Err(reason)) => Err(ScrapeError::Fetch {
                url: url.to_string(),
                reason: reason.clone(),
            }),
            None => Err(ScrapeError::Fetch {
                url: url.to_string(),
                reason: "unknown url".to_string(),
            }),
        }
    }
}

fn config(max_concurrency: usize, on_task_error: OnError) -> ScraperConfig {
    ScraperConfig {
        max_concurrency,
        on_task_error,
        ..ScraperConfig::default()
    }
}

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn words(table: &SharedTable) -> Vec<(String, u64)> {
    table.iter().map(|wc| (wc.word.clone(), wc.count)).collect()
}

#[tokio::test]
async fn duplicate_urls_fetch_once() {
    let fetcher = FakeFetcher::new(vec![("https://example.test/a", Ok("<p>Cat cat dog.</p>"))]);
    let cache = Arc::new(Cache::new());
    let batch = urls(&["https://example.test/a", "https://example.test/a"]);

    let report = scrape(&config(4, OnError::SkipAndLog), &fetcher, cache, &batch)
        .await
        .unwrap();

    assert_eq!(fetcher.calls_for("https://example.test/a"), 1);
    assert_eq!(report.results.len(), 2);
    assert!(report.failures.is_empty());
    for result in &report.results {
        assert_eq!(result.url, "https://example.test/a");
        assert_eq!(
            words(&result.table),
            vec![("dog".to_string(), 1), ("cat".to_string(), 2)]
        );
    }
}

#[tokio::test]
async fn script_text_is_excluded_end_to_end() {
    let fetcher = FakeFetcher::new(vec![(
        "https://example.test/s",
        Ok("<script>ignored text</script><p>Hello hello.</p>"),
    )]);
    let cache = Arc::new(Cache::new());
    let batch = urls(&["https://example.test/s"]);

    let report = scrape(&config(1, OnError::SkipAndLog), &fetcher, cache, &batch)
        .await
        .unwrap();

    assert_eq!(
        words(&report.results[0].table),
        vec![("hello".to_string(), 2)]
    );
}

#[tokio::test]
async fn second_run_over_same_cache_fetches_nothing() {
    let fetcher = FakeFetcher::new(vec![
        ("https://example.test/a", Ok("<p>one two two</p>")),
        ("https://example.test/b", Ok("<p>three</p>")),
    ]);
    let cache = Arc::new(Cache::new());
    let batch = urls(&["https://example.test/a", "https://example.test/b"]);
    let conf = config(2, OnError::SkipAndLog);

    let first = scrape(&conf, &fetcher, cache.clone(), &batch).await.unwrap();
    assert_eq!(fetcher.total_calls(), 2);

    let second = scrape(&conf, &fetcher, cache, &batch).await.unwrap();
    assert_eq!(fetcher.total_calls(), 2, "second run must hit the cache");

    let mut first_tables: Vec<_> = first
        .results
        .iter()
        .map(|r| (r.url.clone(), words(&r.table)))
        .collect();
    let mut second_tables: Vec<_> = second
        .results
        .iter()
        .map(|r| (r.url.clone(), words(&r.table)))
        .collect();
    first_tables.sort();
    second_tables.sort();
    assert_eq!(first_tables, second_tables);
}

#[tokio::test]
async fn concurrency_ceiling_is_respected() {
    let pages: Vec<_> = (0..8)
        .map(|i| (format!("https://example.test/{i}"), "<p>word</p>"))
        .collect();
    let fetcher = FakeFetcher::new(
        pages
            .iter()
            .map(|(url, page)| (url.as_str(), Ok(*page)))
            .collect(),
    );
    let cache = Arc::new(Cache::new());
    let batch: Vec<String> = pages.iter().map(|(url, _)| url.clone()).collect();

    let report = scrape(&config(2, OnError::SkipAndLog), &fetcher, cache, &batch)
        .await
        .unwrap();

    assert_eq!(report.results.len(), 8);
    assert!(
        fetcher.peak() <= 2,
        "peak in-flight fetches {} exceeded the ceiling",
        fetcher.peak()
    );
}

#[tokio::test]
async fn empty_batch_returns_immediately() {
    let fetcher = FakeFetcher::new(vec![]);
    let cache = Arc::new(Cache::new());

    let report = scrape(&config(4, OnError::SkipAndLog), &fetcher, cache, &[])
        .await
        .unwrap();

    assert!(report.results.is_empty());
    assert!(report.failures.is_empty());
    assert_eq!(fetcher.total_calls(), 0);
}

#[tokio::test]
async fn skip_and_log_keeps_siblings_alive() {
    let fetcher = FakeFetcher::new(vec![
        ("https://example.test/ok", Ok("<p>fine</p>")),
        ("https://example.test/down", Err("connection refused")),
        ("https://example.test/also-ok", Ok("<p>fine too</p>")),
    ]);
    let cache = Arc::new(Cache::new());
    let batch = urls(&[
        "https://example.test/ok",
        "https://example.test/down",
        "https://example.test/also-ok",
    ]);

    let report = scrape(
        &config(3, OnError::SkipAndLog),
        &fetcher,
        cache.clone(),
        &batch,
    )
    .await
    .unwrap();

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].url, "https://example.test/down");
    assert!(matches!(
        report.failures[0].error,
        ScrapeError::Fetch { .. }
    ));
    // A failed task must leave no cache entry behind.
    assert!(cache.get("https://example.test/down").is_none());
    assert!(cache.get("https://example.test/ok").is_some());
}

#[tokio::test]
async fn fail_fast_promotes_first_task_error() {
    let fetcher = FakeFetcher::new(vec![
        ("https://example.test/down", Err("timeout")),
        ("https://example.test/ok", Ok("<p>fine</p>")),
    ]);
    let cache = Arc::new(Cache::new());
    let batch = urls(&["https://example.test/down", "https://example.test/ok"]);

    let err = scrape(&config(1, OnError::Fail), &fetcher, cache, &batch)
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::Fetch { ref url, .. } if url == "https://example.test/down"));
    // With a ceiling of 1 the failing task settles before the next starts.
    assert_eq!(fetcher.calls_for("https://example.test/ok"), 0);
}

#[tokio::test]
async fn collector_emits_one_result_per_successful_task() {
    let fetcher = FakeFetcher::new(vec![
        ("https://example.test/a", Ok("<p>a</p>")),
        ("https://example.test/b", Ok("<p>b</p>")),
        ("https://example.test/c", Ok("<p>c</p>")),
    ]);
    let cache = Arc::new(Cache::new());
    let batch = urls(&[
        "https://example.test/a",
        "https://example.test/b",
        "https://example.test/c",
        "https://example.test/a",
    ]);

    let report = scrape(&config(4, OnError::SkipAndLog), &fetcher, cache, &batch)
        .await
        .unwrap();

    // Four tasks, four results, regardless of completion order.
    assert_eq!(report.results.len(), 4);
    let mut urls_seen: Vec<_> = report.results.iter().map(|r| r.url.clone()).collect();
    urls_seen.sort();
    assert_eq!(
        urls_seen,
        vec![
            "https://example.test/a",
            "https://example.test/a",
            "https://example.test/b",
            "https://example.test/c",
        ]
    );
}

#[tokio::test]
async fn duplicates_in_flight_coalesce_into_one_fetch() {
    let fetcher = FakeFetcher::new(vec![("https://example.test/a", Ok("<p>cat dog</p>"))]);
    let cache = Arc::new(Cache::new());
    // All five duplicates run concurrently, racing the same cache miss.
    let batch = urls(&["https://example.test/a"; 5]);

    let report = scrape(&config(5, OnError::SkipAndLog), &fetcher, cache, &batch)
        .await
        .unwrap();

    assert_eq!(fetcher.calls_for("https://example.test/a"), 1);
    assert_eq!(report.results.len(), 5);
    let reference = words(&report.results[0].table);
    for result in &report.results {
        assert_eq!(words(&result.table), reference);
    }
}
