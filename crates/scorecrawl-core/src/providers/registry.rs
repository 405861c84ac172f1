//! Host-rule registry resolving URLs to providers.

use std::sync::Arc;
use thiserror::Error;
use url::Url;

use super::Provider;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("no provider registered for host {0}")]
    NoProvider(String),
}

/// Match rule for a normalized (lowercased, `www.`-stripped) host.
/// Rules can overlap; the registry checks them in insertion order.
#[derive(Debug, Clone)]
pub enum HostRule {
    Exact(&'static str),
    AnyOf(&'static [&'static str]),
    Contains(&'static str),
}

impl HostRule {
    fn matches(&self, host: &str) -> bool {
        match self {
            HostRule::Exact(h) => host == *h,
            HostRule::AnyOf(hs) => hs.contains(&host),
            HostRule::Contains(sub) => host.contains(sub),
        }
    }
}

/// Ordered provider registry. Lookup is read-only and safe to share
/// across jobs behind an `Arc`.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: Vec<(HostRule, Arc<dyn Provider>)>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in providers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            HostRule::AnyOf(&["dropbox.com", "dl.dropboxusercontent.com"]),
            Arc::new(super::DropboxProvider),
        );
        registry.register(
            HostRule::AnyOf(&["i.redd.it", "i.imgur.com"]),
            Arc::new(super::DirectLinkProvider),
        );
        registry
    }

    pub fn register(&mut self, rule: HostRule, provider: Arc<dyn Provider>) -> &mut Self {
        self.entries.push((rule, provider));
        self
    }

    /// Resolves the provider for `url`, trying rules in registration order.
    pub fn resolve(&self, url: &str) -> Result<Arc<dyn Provider>, RegistryError> {
        let parsed = Url::parse(url).map_err(|_| RegistryError::InvalidUrl(url.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| RegistryError::InvalidUrl(url.to_string()))?;
        let host = normalize_host(host);

        for (rule, provider) in &self.entries {
            if rule.matches(&host) {
                return Ok(Arc::clone(provider));
            }
        }
        Err(RegistryError::NoProvider(host))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_host(host: &str) -> String {
    let lower = host.to_ascii_lowercase();
    lower
        .strip_prefix("www.")
        .map(str::to_string)
        .unwrap_or(lower)
}
