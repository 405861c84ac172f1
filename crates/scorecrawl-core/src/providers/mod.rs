//! File-host providers.
//!
//! A provider knows how to turn a shared link on one host into a
//! `FileTree` the materializer can realize. The registry maps host-match
//! rules to providers in deterministic insertion order.

mod direct;
mod dropbox;
mod registry;

pub use direct::DirectLinkProvider;
pub use dropbox::DropboxProvider;
pub use registry::{HostRule, ProviderRegistry};

use async_trait::async_trait;

use crate::filetree::FileTree;

/// Capability to resolve the remote node tree behind a URL.
///
/// Implementations are shared across concurrently running jobs and must
/// not require exclusive access; per-session state (tokens, cookies) is
/// the provider's own concern.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;

    /// Resolves the tree of files/folders behind `url`. May perform
    /// network calls to enumerate folder contents.
    async fn file_tree(&self, url: &str) -> anyhow::Result<FileTree>;
}
