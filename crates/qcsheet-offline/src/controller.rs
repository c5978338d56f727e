use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use qcsheet_net::FetchError;
use thiserror::Error;
use tokio::task::JoinSet;
use url::Url;

use crate::cache::{CacheError, ResourceCache};
use crate::classify::{CachePolicy, Classifier};
use crate::config::{ConfigError, ControllerConfig, OfflineTemplate};
use crate::network::{HttpNetwork, Network};
use crate::request::{Request, Response};

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("invalid precache entry `{entry}`: {source}")]
    InvalidEntry {
        entry: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: Url,
        #[source]
        source: FetchError,
    },
    #[error("{url} answered HTTP {status}")]
    BadResponse { url: Url, status: u16 },
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Serves the app's own resources from the network and a versioned [`ResourceCache`].
///
/// Every intercepted request gets exactly one [`Response`]: network and cache failures fall
/// back to the cache or the configured offline page and are only logged.
pub struct OfflineController {
    namespace: String,
    scope: Url,
    precache: Vec<String>,
    offline: OfflineTemplate,
    classifier: Classifier,
    cache: Arc<dyn ResourceCache>,
    network: Arc<dyn Network>,
    pending_writes: Mutex<JoinSet<()>>,
    controlling: AtomicBool,
}

impl OfflineController {
    pub fn new(
        config: ControllerConfig,
        cache: Arc<dyn ResourceCache>,
        network: Arc<dyn Network>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            namespace: config.namespace(),
            classifier: config.classifier(),
            scope: config.scope,
            precache: config.precache,
            offline: config.offline,
            cache,
            network,
            pending_writes: Mutex::new(JoinSet::new()),
            controlling: AtomicBool::new(false),
        })
    }

    /// A controller that talks to the network over HTTP, treating the scope's origin as
    /// same-origin.
    pub fn with_http(
        config: ControllerConfig,
        cache: Arc<dyn ResourceCache>,
    ) -> Result<Self, ControllerBuildError> {
        let network = HttpNetwork::new(&config.scope)?.with_max_body_bytes(config.max_body_bytes);
        Ok(Self::new(config, cache, Arc::new(network))?)
    }

    /// Name of the namespace this version reads and writes.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether [`activate`](Self::activate) has completed.
    pub fn is_controlling(&self) -> bool {
        self.controlling.load(Ordering::Acquire)
    }

    /// Fetch every precache entry and store them all in the current namespace.
    ///
    /// Nothing is written unless every entry was fetched with a 2xx status.
    pub async fn install(&self) -> Result<(), InstallError> {
        log::info!("installing resource cache `{}`", self.namespace);

        let mut entries = Vec::with_capacity(self.precache.len());
        for entry in &self.precache {
            let url = self
                .scope
                .join(entry)
                .map_err(|source| InstallError::InvalidEntry {
                    entry: entry.clone(),
                    source,
                })?;
            let request = Request::get(url);
            let response = match self.network.fetch(&request).await {
                Ok(response) => response,
                Err(source) => {
                    return Err(InstallError::Fetch {
                        url: request.url,
                        source,
                    })
                }
            };
            if !response.is_ok() {
                return Err(InstallError::BadResponse {
                    url: request.url,
                    status: response.status,
                });
            }
            entries.push((request, response));
        }

        let cache = self.cache.clone();
        let namespace = self.namespace.clone();
        let count = entries.len();
        tokio::task::spawn_blocking(move || -> Result<(), CacheError> {
            let written = cache.open_namespace(&namespace).and_then(|()| {
                entries
                    .iter()
                    .try_for_each(|(request, response)| cache.put(&namespace, request, response))
            });
            if written.is_err() {
                // A half-populated namespace must not be activated later.
                if let Err(err) = cache.delete_namespace(&namespace) {
                    log::warn!("failed to discard partial cache `{namespace}`: {err}");
                }
            }
            written
        })
        .await
        .map_err(CacheError::from)??;

        log::info!("installed {count} resources into `{}`", self.namespace);
        Ok(())
    }

    /// Delete every namespace except the current one, then start controlling clients.
    ///
    /// Returns the deleted namespaces.
    pub async fn activate(&self) -> Result<Vec<String>, CacheError> {
        let cache = self.cache.clone();
        let current = self.namespace.clone();
        let removed = tokio::task::spawn_blocking(move || -> Result<Vec<String>, CacheError> {
            let mut removed = Vec::new();
            for name in cache.list_namespaces()? {
                if name == current {
                    continue;
                }
                cache.delete_namespace(&name)?;
                log::info!("deleted stale resource cache `{name}`");
                removed.push(name);
            }
            cache.open_namespace(&current)?;
            Ok(removed)
        })
        .await??;

        self.controlling.store(true, Ordering::Release);
        log::info!("resource cache `{}` is active", self.namespace);
        Ok(removed)
    }

    /// Answer one intercepted request according to its [`CachePolicy`].
    pub async fn handle_fetch(&self, request: Request) -> Response {
        match self.classifier.classify(&request.url) {
            CachePolicy::NetworkFirst => self.network_first(request).await,
            CachePolicy::CacheFirst => self.cache_first(request).await,
            CachePolicy::Passthrough => self.passthrough(request).await,
        }
    }

    /// Wait for every background cache write started so far.
    pub async fn settle(&self) {
        loop {
            let mut writes = std::mem::take(
                &mut *self
                    .pending_writes
                    .lock()
                    .expect("pending writes mutex poisoned"),
            );
            if writes.is_empty() {
                return;
            }
            while let Some(result) = writes.join_next().await {
                if let Err(err) = result {
                    log::warn!("background cache write panicked: {err}");
                }
            }
        }
    }

    async fn network_first(&self, request: Request) -> Response {
        match self.network.fetch(&request).await {
            Ok(response) => {
                self.store_in_background(&request, &response);
                response
            }
            Err(err) => {
                log::warn!("network failed for {}, trying cache: {err}", request.url);
                match self.lookup(&request).await {
                    Some(cached) => cached,
                    None => self.offline_response(),
                }
            }
        }
    }

    async fn cache_first(&self, request: Request) -> Response {
        if let Some(cached) = self.lookup(&request).await {
            log::debug!("cache hit for {}", request.url);
            return cached;
        }
        match self.network.fetch(&request).await {
            Ok(response) => {
                self.store_in_background(&request, &response);
                response
            }
            Err(err) => {
                log::warn!("network failed for uncached {}: {err}", request.url);
                self.offline_response()
            }
        }
    }

    async fn passthrough(&self, request: Request) -> Response {
        match self.network.fetch(&request).await {
            Ok(response) => response,
            Err(err) => {
                log::warn!("network failed for {}: {err}", request.url);
                self.offline_response()
            }
        }
    }

    async fn lookup(&self, request: &Request) -> Option<Response> {
        if !request.is_cacheable() {
            return None;
        }
        let cache = self.cache.clone();
        let namespace = self.namespace.clone();
        let request = request.clone();
        let url = request.url.clone();
        match tokio::task::spawn_blocking(move || cache.match_request(&namespace, &request)).await
        {
            Ok(Ok(found)) => found,
            Ok(Err(err)) => {
                log::warn!("cache lookup failed for {url}: {err}");
                None
            }
            Err(err) => {
                log::warn!("cache lookup task failed for {url}: {err}");
                None
            }
        }
    }

    fn store_in_background(&self, request: &Request, response: &Response) {
        if !request.is_cacheable() || !response.is_cacheable() {
            return;
        }
        let cache = self.cache.clone();
        let namespace = self.namespace.clone();
        let request = request.clone();
        let response = response.clone();
        let mut writes = self
            .pending_writes
            .lock()
            .expect("pending writes mutex poisoned");
        reap_finished(&mut writes);
        writes.spawn_blocking(move || {
            if let Err(err) = cache.put(&namespace, &request, &response) {
                log::warn!("failed to cache {}: {err}", request.url);
            }
        });
    }

    /// Background cache writes started but not yet reaped. Finished writes are reaped whenever
    /// a new one starts and by [`settle`](Self::settle).
    pub fn pending_writes(&self) -> usize {
        let mut writes = self
            .pending_writes
            .lock()
            .expect("pending writes mutex poisoned");
        reap_finished(&mut writes);
        writes.len()
    }

    fn offline_response(&self) -> Response {
        self.offline.to_response()
    }
}

fn reap_finished(writes: &mut JoinSet<()>) {
    while let Some(result) = writes.try_join_next() {
        if let Err(err) = result {
            log::warn!("background cache write panicked: {err}");
        }
    }
}

#[derive(Debug, Error)]
pub enum ControllerBuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    Network(#[from] FetchError),
}
