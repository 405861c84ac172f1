//! Download orchestration: drives the crawl, schedules one job per
//! discovered link, and reports per-link outcomes.

mod pipeline;
mod title;

pub use pipeline::{LinkReport, LinkStatus};
pub use title::{escape_title, TitleCounter};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::archive;
use crate::crawler::{CrawlError, PostInfo, PostSource};
use crate::fetch::FileFetcher;
use crate::jobs::JobQueue;
use crate::ledger::{ResumeKey, ResumeRecord};
use crate::providers::ProviderRegistry;

use pipeline::{run_link, LinkJob};

/// Decides, from the prior run's record (if any), whether a link should be
/// downloaded again even when its target already exists.
pub type OverwritePredicate = Arc<dyn Fn(Option<&ResumeRecord>) -> bool + Send + Sync>;

/// Decides whether a link's download should be archived and the raw
/// directory discarded.
pub type ZipPredicate = Arc<dyn Fn(&PostInfo, usize) -> bool + Send + Sync>;

/// Overwrite when the ledger has no entry or the entry asks for it.
pub fn default_overwrite_predicate() -> OverwritePredicate {
    Arc::new(|record| record.map_or(true, |r| r.overwrite))
}

/// Batch-level knobs for one crawl run.
#[derive(Clone)]
pub struct BatchOptions {
    /// Maximum download jobs in flight at once.
    pub max_concurrent: usize,
    /// Stop scheduling after this many posts (None = until the feed is exhausted).
    pub post_limit: Option<usize>,
    /// Pause after a rate-limited feed response, before asking for more work.
    pub rate_limit_backoff: Duration,
    pub overwrite: OverwritePredicate,
    pub zip: ZipPredicate,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 15,
            post_limit: None,
            rate_limit_backoff: Duration::from_secs(60),
            overwrite: default_overwrite_predicate(),
            zip: Arc::new(|_, _| false),
        }
    }
}

/// What a finished batch produced.
pub struct BatchReport {
    /// Terminal outcome of every scheduled link, in completion order.
    pub outcomes: Vec<LinkReport>,
}

impl BatchReport {
    /// Resume records to append to the ledger.
    pub fn records(&self) -> Vec<ResumeRecord> {
        self.outcomes
            .iter()
            .filter_map(|o| o.record.clone())
            .collect()
    }

    pub fn count(&self, status: LinkStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

/// Schedules downloads for every link the crawler discovers and waits for
/// the whole batch to finish.
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    fetcher: Arc<dyn FileFetcher>,
    download_dir: PathBuf,
    resume: HashMap<ResumeKey, ResumeRecord>,
    options: BatchOptions,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        fetcher: Arc<dyn FileFetcher>,
        download_dir: PathBuf,
        resume: HashMap<ResumeKey, ResumeRecord>,
        options: BatchOptions,
    ) -> Self {
        Self {
            registry,
            fetcher,
            download_dir,
            resume,
            options,
        }
    }

    /// Crawls `source` until exhaustion (or the post limit), scheduling one
    /// job per link, then blocks until every job reached a terminal state.
    ///
    /// Individual link failures never abort the batch; they come back as
    /// `LinkStatus::Failed` in the report. A rate-limited feed response
    /// pauses the crawl before more work is produced; running downloads
    /// are unaffected.
    pub async fn run(&self, source: &mut dyn PostSource) -> Result<BatchReport> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .with_context(|| {
                format!(
                    "failed to create download dir {}",
                    self.download_dir.display()
                )
            })?;

        let queue: JobQueue<LinkReport> = JobQueue::new(self.options.max_concurrent);
        let mut titles = TitleCounter::new();
        let mut posts_seen = 0usize;
        // Links satisfied by a prior run are reported here without a job.
        let mut outcomes: Vec<LinkReport> = Vec::new();

        'crawl: while !source.is_done() {
            let page = match source.next_page().await {
                Ok(page) => page,
                Err(CrawlError::RateLimited) => {
                    tracing::warn!(
                        backoff_secs = self.options.rate_limit_backoff.as_secs(),
                        "feed rate limited, backing off"
                    );
                    tokio::time::sleep(self.options.rate_limit_backoff).await;
                    continue;
                }
                Err(err) => {
                    tracing::error!(error = %err, "crawl failed, finishing scheduled work");
                    break;
                }
            };

            for post in page {
                if let Some(limit) = self.options.post_limit {
                    if posts_seen >= limit {
                        break 'crawl;
                    }
                }
                posts_seen += 1;
                self.schedule_post(&queue, &mut titles, &mut outcomes, post);
            }
        }

        queue.join_all().await;
        outcomes.extend(queue.collect_results());
        Ok(BatchReport { outcomes })
    }

    /// Submits one job per link of `post` that still needs work; links
    /// already satisfied on disk are reported without touching the queue.
    fn schedule_post(
        &self,
        queue: &JobQueue<LinkReport>,
        titles: &mut TitleCounter,
        outcomes: &mut Vec<LinkReport>,
        post: PostInfo,
    ) {
        let escaped = escape_title(&post.title);

        for (link_index, url) in post.score_urls.iter().enumerate() {
            let target = self.download_dir.join(titles.claim(&escaped));
            let key = ResumeKey {
                post_id: post.id.clone(),
                link_index,
            };
            let prior = self.resume.get(&key).cloned();
            let overwrite = (self.options.overwrite)(prior.as_ref());
            let zip = (self.options.zip)(&post, link_index);

            if !overwrite {
                // A zipped link is satisfied by its `.zip` sibling (the raw
                // directory was discarded by the chain); otherwise the
                // target directory itself decides.
                let zip_path = archive::zip_sibling(&target);
                let satisfied = if zip { zip_path.exists() } else { target.exists() };
                if satisfied {
                    tracing::info!(target = %target.display(), "already satisfied, skipping");
                    let save_location = if zip {
                        zip_path
                    } else {
                        prior
                            .as_ref()
                            .map(|p| p.save_location.clone())
                            .unwrap_or_else(|| target.clone())
                    };
                    outcomes.push(LinkReport {
                        post_id: post.id.clone(),
                        link_index,
                        status: LinkStatus::Skipped,
                        record: Some(ResumeRecord {
                            post_id: post.id.clone(),
                            save_location,
                            link_index,
                            url: url.clone(),
                            downloaded_at: Utc::now(),
                            overwrite: false,
                        }),
                    });
                    continue;
                }
                // Zip pending on an existing raw directory: the job skips
                // the download stage and runs only the zip chain.
            }

            let job = LinkJob {
                post_id: post.id.clone(),
                link_index,
                url: url.clone(),
                target,
                prior,
                overwrite,
                zip,
                registry: Arc::clone(&self.registry),
                fetcher: Arc::clone(&self.fetcher),
            };

            tracing::info!(post = %post.title, url = %url, "queueing download");
            let label = format!("{}#{}", post.id, link_index);
            queue.submit(Box::new(move || Box::pin(run_link(job))), label);
        }
    }
}
