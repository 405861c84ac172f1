//! HTTP byte fetching for leaf downloads.
//!
//! Providers hand the materializer leaf URLs; this module turns a URL into
//! bytes plus the filename the server advertised (Content-Disposition),
//! which for several hosts is the only place the name exists.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::names;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("request failed for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Result of fetching one leaf: the payload and, if the server sent one,
/// the filename from the Content-Disposition header.
pub struct FetchedFile {
    pub bytes: Bytes,
    pub filename: Option<String>,
}

/// Seam between the tree materializer and the network. Implementations
/// must be usable from many jobs concurrently.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedFile, FetchError>;
}

/// reqwest-backed fetcher shared by all providers.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    /// Shares an existing client (e.g. with the feed crawler).
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Clone of the underlying client, so the feed crawler can reuse the
    /// same connection pool and User-Agent.
    pub fn client(&self) -> Client {
        self.client.clone()
    }
}

#[async_trait]
impl FileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedFile, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let filename = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(names::content_disposition_filename);

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        tracing::debug!(url, size = bytes.len(), "fetched leaf");

        Ok(FetchedFile { bytes, filename })
    }
}
