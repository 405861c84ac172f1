//! Dropbox provider.
//!
//! Shared Dropbox links render an HTML page unless the `dl` query
//! parameter is 1; with it set the link serves the bytes (a zip when the
//! share is a folder) and names the file via Content-Disposition.

use anyhow::Context;
use async_trait::async_trait;
use url::Url;

use super::Provider;
use crate::filetree::FileTree;

#[derive(Default)]
pub struct DropboxProvider;

/// Forces `dl=1` on the shared link, replacing an existing `dl` value and
/// keeping every other query parameter.
fn force_download_url(url: &str) -> anyhow::Result<Url> {
    let parsed = Url::parse(url).with_context(|| format!("invalid dropbox url: {url}"))?;

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "dl")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut out = parsed;
    {
        let mut query = out.query_pairs_mut();
        query.clear();
        for (k, v) in &kept {
            query.append_pair(k, v);
        }
        query.append_pair("dl", "1");
    }
    Ok(out)
}

#[async_trait]
impl Provider for DropboxProvider {
    fn name(&self) -> &'static str {
        "dropbox"
    }

    async fn file_tree(&self, url: &str) -> anyhow::Result<FileTree> {
        let download_url = force_download_url(url)?;
        Ok(FileTree::single_file(download_url, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_dl_parameter() {
        let u = force_download_url("https://www.dropbox.com/s/abc/score.pdf").unwrap();
        assert_eq!(u.as_str(), "https://www.dropbox.com/s/abc/score.pdf?dl=1");
    }

    #[test]
    fn replaces_existing_dl_parameter() {
        let u = force_download_url("https://www.dropbox.com/s/abc/score.pdf?dl=0").unwrap();
        assert_eq!(u.as_str(), "https://www.dropbox.com/s/abc/score.pdf?dl=1");
    }

    #[test]
    fn keeps_other_parameters() {
        let u =
            force_download_url("https://www.dropbox.com/s/abc/score.pdf?rlkey=k&dl=0").unwrap();
        assert_eq!(
            u.as_str(),
            "https://www.dropbox.com/s/abc/score.pdf?rlkey=k&dl=1"
        );
    }
}
