//! `scorecrawl run` – crawl the feed and download every discovered link.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use scorecrawl_core::config::CrawlConfig;
use scorecrawl_core::crawler::SubredditStream;
use scorecrawl_core::fetch::HttpFetcher;
use scorecrawl_core::ledger;
use scorecrawl_core::orchestrator::{
    default_overwrite_predicate, BatchOptions, LinkStatus, Orchestrator,
};
use scorecrawl_core::providers::ProviderRegistry;

pub async fn run_crawl(
    cfg: &CrawlConfig,
    subreddit: Option<String>,
    limit: Option<usize>,
    concurrency: Option<usize>,
    zip: bool,
    overwrite: bool,
) -> Result<()> {
    let subreddit = subreddit.unwrap_or_else(|| cfg.subreddit.clone());
    let resume = ledger::load(&cfg.ledger_path)?;
    if !resume.is_empty() {
        tracing::info!("loaded {} ledger record(s)", resume.len());
    }

    let fetcher = HttpFetcher::new(
        &cfg.user_agent,
        Duration::from_secs(cfg.request_timeout_secs),
    )?;
    let mut feed = SubredditStream::new(fetcher.client(), &subreddit, cfg.page_size);

    let options = BatchOptions {
        max_concurrent: concurrency.unwrap_or(cfg.max_concurrent_downloads),
        post_limit: limit,
        rate_limit_backoff: Duration::from_secs(cfg.rate_limit_backoff_secs),
        overwrite: if overwrite {
            Arc::new(|_| true)
        } else {
            default_overwrite_predicate()
        },
        zip: Arc::new(move |_, _| zip),
    };

    let orchestrator = Orchestrator::new(
        Arc::new(ProviderRegistry::with_defaults()),
        Arc::new(fetcher),
        cfg.download_dir.clone(),
        resume,
        options,
    );

    println!("Crawling r/{subreddit} ...");
    let report = orchestrator.run(&mut feed).await?;

    ledger::append_all(&cfg.ledger_path, &report.records())?;

    let total = report.outcomes.len();
    if total == 0 {
        println!("No links discovered.");
        return Ok(());
    }

    println!("{total} link(s) processed:");
    for (status, label) in [
        (LinkStatus::Downloaded, "downloaded"),
        (LinkStatus::Zipped, "zipped"),
        (LinkStatus::Skipped, "skipped"),
        (LinkStatus::NoProvider, "no provider"),
        (LinkStatus::ZipFailed, "zip failed"),
        (LinkStatus::Failed, "failed"),
    ] {
        let count = report.count(status);
        if count > 0 {
            println!("  {label:<12} {count}");
        }
    }

    Ok(())
}
