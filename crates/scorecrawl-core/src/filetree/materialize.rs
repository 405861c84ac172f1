//! Turns a `FileTree` into directories and files on disk.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::{FileTree, NodeId, NodeKind};
use crate::fetch::FileFetcher;
use crate::names;

/// Materializes the tree rooted at `root` under `parent_dir`.
///
/// Walks with an explicit work stack (never language recursion, so tree
/// depth cannot overflow the call stack) in deterministic order: one
/// directory per folder node, one fetched file per leaf. Creates only the
/// single directory level named by each stack entry; ancestors were
/// created by earlier pops, and `parent_dir` itself is created on the
/// first pop if missing.
///
/// On any fetch or write failure the whole call fails. No cleanup happens
/// here: the caller owns deleting partial output under `parent_dir`.
pub async fn materialize(
    tree: &FileTree,
    root: NodeId,
    parent_dir: &Path,
    fetcher: &dyn FileFetcher,
) -> Result<()> {
    let mut stack: Vec<(NodeId, PathBuf)> = vec![(root, parent_dir.to_path_buf())];

    while let Some((node, dir)) = stack.pop() {
        if !dir.exists() {
            tokio::fs::create_dir(&dir)
                .await
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }

        let realized = realize(tree, node, &dir, fetcher).await?;
        for &child in tree.children(node) {
            stack.push((child, realized.clone()));
        }
    }

    Ok(())
}

/// Realizes one node into `dir` and returns the resulting on-disk path.
async fn realize(
    tree: &FileTree,
    node: NodeId,
    dir: &Path,
    fetcher: &dyn FileFetcher,
) -> Result<PathBuf> {
    match tree.kind(node) {
        NodeKind::Folder { name } => {
            let path = dir.join(names::sanitize_filename(name));
            if !path.exists() {
                tokio::fs::create_dir(&path)
                    .await
                    .with_context(|| format!("failed to create directory {}", path.display()))?;
            }
            Ok(path)
        }
        NodeKind::File { url, name } => {
            let fetched = fetcher
                .fetch(url)
                .await
                .with_context(|| format!("failed to fetch {url}"))?;
            let filename =
                names::derive_filename(name.as_deref(), fetched.filename.as_deref(), url);
            let path = dir.join(filename);
            tokio::fs::write(&path, &fetched.bytes)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            Ok(path)
        }
    }
}
