//! Direct-link provider: the URL already points at the bytes.

use async_trait::async_trait;

use super::Provider;
use crate::filetree::FileTree;

/// Provider for hosts that serve the file directly at the shared URL.
/// The tree is a single leaf; the filename comes from the response
/// (Content-Disposition) or the URL path.
#[derive(Default)]
pub struct DirectLinkProvider;

#[async_trait]
impl Provider for DirectLinkProvider {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn file_tree(&self, url: &str) -> anyhow::Result<FileTree> {
        Ok(FileTree::single_file(url, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filetree::NodeKind;

    #[tokio::test]
    async fn yields_single_unnamed_leaf() {
        let tree = DirectLinkProvider
            .file_tree("https://cdn.example.com/score.pdf")
            .await
            .unwrap();
        let root = tree.root().unwrap();
        assert!(tree.children(root).is_empty());
        match tree.kind(root) {
            NodeKind::File { url, name } => {
                assert_eq!(url, "https://cdn.example.com/score.pdf");
                assert!(name.is_none());
            }
            other => panic!("unexpected node kind: {other:?}"),
        }
    }
}
