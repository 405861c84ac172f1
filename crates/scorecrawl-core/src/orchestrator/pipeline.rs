//! Per-link download pipeline.
//!
//! Each link runs as one scheduled job: skip/download decision, provider
//! resolution, tree materialization with delete-on-failure cleanup, the
//! optional zip chain, and the resume record for the final artifact. The
//! stages run sequentially inside the job so failure and cleanup ordering
//! stay easy to follow.

use anyhow::Context;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::archive;
use crate::fetch::FileFetcher;
use crate::filetree::materialize;
use crate::ledger::ResumeRecord;
use crate::providers::ProviderRegistry;

/// Terminal state of one (post, link) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkStatus {
    /// Target already on disk and overwrite not requested.
    Skipped,
    /// Fresh download, kept as a raw directory.
    Downloaded,
    /// Raw directory archived and discarded.
    Zipped,
    /// Archive step failed; the raw directory was still discarded.
    ZipFailed,
    /// Download failed; partial output was deleted.
    Failed,
    /// No registered provider matched the link.
    NoProvider,
}

/// Outcome of one link, surfaced through the job queue.
#[derive(Debug, Clone)]
pub struct LinkReport {
    pub post_id: String,
    pub link_index: usize,
    pub status: LinkStatus,
    /// Absent only when no provider matched (nothing to resume from).
    pub record: Option<ResumeRecord>,
}

/// Everything one link job needs, owned so the job can outlive the crawl loop.
pub(crate) struct LinkJob {
    pub post_id: String,
    pub link_index: usize,
    pub url: String,
    pub target: PathBuf,
    pub prior: Option<ResumeRecord>,
    pub overwrite: bool,
    pub zip: bool,
    pub registry: Arc<ProviderRegistry>,
    pub fetcher: Arc<dyn FileFetcher>,
}

enum DownloadOutcome {
    Done,
    NoProvider,
    Failed,
}

pub(crate) async fn run_link(job: LinkJob) -> anyhow::Result<Option<LinkReport>> {
    let zip_path = archive::zip_sibling(&job.target);

    // Stage 1: download, unless the target already satisfies the link.
    let mut status;
    if !job.overwrite && job.target.exists() {
        tracing::info!(target = %job.target.display(), "target exists, skipping download");
        status = LinkStatus::Skipped;
    } else {
        status = match download_stage(&job).await {
            DownloadOutcome::Done => LinkStatus::Downloaded,
            DownloadOutcome::NoProvider => {
                return Ok(Some(LinkReport {
                    post_id: job.post_id,
                    link_index: job.link_index,
                    status: LinkStatus::NoProvider,
                    record: None,
                }));
            }
            DownloadOutcome::Failed => LinkStatus::Failed,
        };
    }

    // Stage 2: zip chaining, only on a satisfied download.
    if job.zip && status != LinkStatus::Failed && job.target.exists() {
        status = match zip_stage(&job.target, &zip_path).await {
            Ok(()) => LinkStatus::Zipped,
            Err(err) => {
                tracing::error!(
                    target = %job.target.display(),
                    error = %format!("{err:#}"),
                    "zip step failed"
                );
                LinkStatus::ZipFailed
            }
        };
    }

    // Stage 3: describe the final artifact. A failed zip still records the
    // attempted archive path (the raw directory is gone either way).
    let save_location = if matches!(status, LinkStatus::Zipped | LinkStatus::ZipFailed) {
        zip_path
    } else if status == LinkStatus::Skipped {
        job.prior
            .as_ref()
            .map(|p| p.save_location.clone())
            .unwrap_or_else(|| job.target.clone())
    } else {
        job.target.clone()
    };

    let record = ResumeRecord {
        post_id: job.post_id.clone(),
        save_location,
        link_index: job.link_index,
        url: job.url.clone(),
        downloaded_at: Utc::now(),
        overwrite: false,
    };

    Ok(Some(LinkReport {
        post_id: job.post_id,
        link_index: job.link_index,
        status,
        record: Some(record),
    }))
}

/// Resolves the provider, materializes its tree under the target path, and
/// deletes partial output if anything fails.
async fn download_stage(job: &LinkJob) -> DownloadOutcome {
    let provider = match job.registry.resolve(&job.url) {
        Ok(provider) => provider,
        Err(err) => {
            tracing::warn!(url = %job.url, error = %err, "skipping link");
            return DownloadOutcome::NoProvider;
        }
    };

    tracing::info!(url = %job.url, provider = provider.name(), target = %job.target.display(), "downloading");

    let result = async {
        let tree = provider.file_tree(&job.url).await?;
        let root = tree
            .root()
            .with_context(|| format!("provider {} returned an empty tree", provider.name()))?;
        materialize(&tree, root, &job.target, job.fetcher.as_ref()).await
    }
    .await;

    match result {
        Ok(()) => DownloadOutcome::Done,
        Err(err) => {
            tracing::error!(
                url = %job.url,
                target = %job.target.display(),
                error = %format!("{err:#}"),
                "download failed, deleting partial output"
            );
            remove_target(&job.target).await;
            DownloadOutcome::Failed
        }
    }
}

/// Archives the raw directory, then deletes it regardless of archive
/// success so a half-processed raw copy never lingers. A failed archive
/// also removes its partial zip.
async fn zip_stage(target: &Path, zip_path: &Path) -> anyhow::Result<()> {
    let (src, out) = (target.to_path_buf(), zip_path.to_path_buf());
    let archived = tokio::task::spawn_blocking(move || archive::zip_dir(&src, &out))
        .await
        .context("zip task aborted")
        .and_then(|r| r);

    if archived.is_err() && zip_path.exists() {
        if let Err(err) = tokio::fs::remove_file(zip_path).await {
            tracing::error!(path = %zip_path.display(), error = %err, "failed to remove partial zip");
        }
    }
    remove_target(target).await;
    archived
}

async fn remove_target(target: &Path) {
    if !target.exists() {
        return;
    }
    if let Err(err) = tokio::fs::remove_dir_all(target).await {
        tracing::error!(path = %target.display(), error = %err, "failed to delete target");
    }
}
