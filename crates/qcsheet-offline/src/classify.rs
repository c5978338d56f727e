use url::Url;

/// How the controller serves one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachePolicy {
    /// Network, falling back to the cache, then the offline page.
    NetworkFirst,
    /// Cache, falling back to the network, then the offline page.
    CacheFirst,
    /// Network only; the cache is never consulted or written.
    Passthrough,
}

/// Static classification by URL substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    root_path: String,
    network_first: Vec<String>,
    cache_first: Vec<String>,
}

impl Classifier {
    pub fn new(
        root_path: impl Into<String>,
        network_first: Vec<String>,
        cache_first: Vec<String>,
    ) -> Self {
        Self {
            root_path: root_path.into(),
            network_first,
            cache_first,
        }
    }

    pub fn classify(&self, url: &Url) -> CachePolicy {
        let text = url.as_str();
        let policy = if url.path() == self.root_path
            || self.network_first.iter().any(|entry| text.contains(entry.as_str()))
        {
            CachePolicy::NetworkFirst
        } else if self.cache_first.iter().any(|entry| text.contains(entry.as_str())) {
            CachePolicy::CacheFirst
        } else {
            CachePolicy::Passthrough
        };
        log::debug!("{url} -> {policy:?}");
        policy
    }
}
