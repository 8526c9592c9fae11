use std::env;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::runtime;
use wfs_scraper::{scrape, Cache, HttpFetcher, OnError, ScraperConfig};

/// Word Frequency Scraper
///
/// Fetches the given pages concurrently and reports each page's most
/// frequent visible words as results complete.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct Args {
    /// URLs to scrape, in order; duplicates are resolved from cache
    #[clap(required_unless_present = "input-file")]
    pub urls: Vec<String>,
    /// Path to a file with one URL per line (used when no URLs are given)
    #[clap(parse(from_os_str), long, short)]
    pub input_file: Option<PathBuf>,
    /// Optional default scraper yaml configuration file
    #[clap(env = "WFS_SCRAPER_CONFIG", parse(from_os_str), long)]
    pub scraper_config: Option<PathBuf>,
    /// Override scraper's user agent
    #[clap(long)]
    pub user_agent: Option<String>,
    /// Override scraper's maximum concurrent page tasks
    #[clap(long)]
    pub max_concurrency: Option<usize>,
    /// Override scraper's page download timeout in seconds
    #[clap(long)]
    pub fetch_timeout_secs: Option<u64>,
    /// Override scraper's task error handling strategy
    #[clap(arg_enum, long)]
    pub on_task_error: Option<OnError>,
    /// Override the number of top words logged per page
    #[clap(long)]
    pub excerpt_words: Option<usize>,
    /// When quiet no logs are outputted
    #[clap(long, short)]
    pub quiet: bool,
}

impl TryFrom<&Args> for ScraperConfig {
    type Error = anyhow::Error;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        let mut conf = if let Some(file) = args.scraper_config.as_ref().map(fs_err::File::open) {
            serde_yaml::from_reader(file?)?
        } else {
            ScraperConfig::default()
        };
        if let Some(user_agent) = &args.user_agent {
            conf.user_agent = user_agent.to_string();
        }
        if let Some(max_concurrency) = args.max_concurrency {
            conf.max_concurrency = max_concurrency;
        }
        if let Some(fetch_timeout_secs) = args.fetch_timeout_secs {
            conf.fetch_timeout_secs = fetch_timeout_secs;
        }
        if let Some(on_task_error) = args.on_task_error {
            conf.on_task_error = on_task_error;
        }
        if let Some(excerpt_words) = args.excerpt_words {
            conf.excerpt_words = excerpt_words;
        }
        Ok(conf)
    }
}

fn batch_urls(args: &Args) -> anyhow::Result<Vec<String>> {
    if !args.urls.is_empty() {
        return Ok(args.urls.clone());
    }
    let path = args
        .input_file
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Missing `urls` or `input-file`"))?;
    let reader = BufReader::new(fs_err::File::open(path)?);
    let mut urls = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let url = line.trim();
        if !url.is_empty() {
            urls.push(url.to_string());
        }
    }
    Ok(urls)
}

fn run(args: Args) -> anyhow::Result<()> {
    let conf: ScraperConfig = (&args).try_into()?;
    let urls = batch_urls(&args)?;
    let fetcher = HttpFetcher::new(&conf)?;
    let cache = Arc::new(Cache::new());

    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    let report = rt.block_on(scrape(&conf, &fetcher, cache, &urls))?;

    log::info!(
        "batch finished: {} pages done, {} failed",
        report.results.len(),
        report.failures.len()
    );
    for failure in &report.failures {
        log::warn!("failed {}: {}", failure.url, failure.error);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if !args.quiet {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "wfs_scraper=info,wfs_cli=info");
        }
        env_logger::init();
    }
    run(args)
}
