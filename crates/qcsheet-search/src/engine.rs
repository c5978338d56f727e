use std::sync::Arc;

use qcsheet_net::FetchError;
use qcsheet_store::{ByteStore, StoreError};
use serde::Serialize;
use thiserror::Error;

use crate::cache::{TableCache, TableCacheStats};
use crate::fetch::SourceFetcher;
use crate::parse::{ParseError, TableParser, XlsxParser};
use crate::table::{ParsedTable, SearchRow};

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("network: {0}")]
    Network(#[from] FetchError),
    #[error("persistent store: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to retrieve `{source_id}`: {source}")]
    Retrieval {
        source_id: String,
        #[source]
        source: RetrievalError,
    },
    #[error("failed to parse `{source_id}`: {source}")]
    Parse {
        source_id: String,
        #[source]
        source: ParseError,
    },
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl EngineError {
    pub fn source_id(&self) -> Option<&str> {
        match self {
            EngineError::Retrieval { source_id, .. } | EngineError::Parse { source_id, .. } => {
                Some(source_id)
            }
            EngineError::Task(_) => None,
        }
    }

    fn retrieval(source_id: &str, source: impl Into<RetrievalError>) -> Self {
        EngineError::Retrieval {
            source_id: source_id.to_string(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Outcome of [`SearchEngine::refresh_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub attempted: usize,
    pub failures: usize,
}

impl RefreshSummary {
    pub fn is_success(&self) -> bool {
        self.failures == 0
    }

    /// Status line shown after a refresh: empty on success, otherwise the failure count.
    pub fn status_message(&self) -> String {
        if self.is_success() {
            String::new()
        } else {
            format!("更新 Excel 文件出错数量：{}", self.failures)
        }
    }
}

/// Resolves register sources through three tiers (memory, persistent store, network) and
/// searches the parsed tables.
///
/// A source is downloaded and parsed at most once per process unless it is refreshed:
/// resolution of one source id is serialized behind a per-source lock and re-checks the
/// memory tier after acquiring it. Different sources resolve concurrently.
pub struct SearchEngine {
    fetcher: Arc<dyn SourceFetcher>,
    store: Arc<dyn ByteStore>,
    parser: Arc<dyn TableParser>,
    cache: TableCache,
}

impl SearchEngine {
    pub fn new(fetcher: Arc<dyn SourceFetcher>, store: Arc<dyn ByteStore>) -> Self {
        Self {
            fetcher,
            store,
            parser: Arc::new(XlsxParser),
            cache: TableCache::new(),
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn TableParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn cache(&self) -> &TableCache {
        &self.cache
    }

    pub fn stats_snapshot(&self) -> TableCacheStats {
        self.cache.stats_snapshot()
    }

    /// Rows of `source_id` whose `search_column` contains `search_value`, projected onto
    /// `target_columns`.
    pub async fn search(
        &self,
        source_id: &str,
        search_value: &str,
        search_column: u32,
        target_columns: &[u32],
    ) -> Result<Vec<SearchRow>> {
        let table = self.table(source_id).await?;
        let rows = table.search(search_value, search_column, target_columns);
        log::debug!(
            "search `{search_value}` in `{source_id}` column {search_column}: {} rows",
            rows.len()
        );
        Ok(rows)
    }

    /// The parsed table for `source_id`, resolving it on first use.
    pub async fn table(&self, source_id: &str) -> Result<Arc<ParsedTable>> {
        if let Some(table) = self.cache.get(source_id) {
            self.cache.record(|s| s.memory_hits += 1);
            return Ok(table);
        }

        let lock = self.cache.source_lock(source_id);
        let _guard = lock.lock().await;

        // Another task may have finished resolving while we waited.
        if let Some(table) = self.cache.get(source_id) {
            self.cache.record(|s| s.memory_hits += 1);
            return Ok(table);
        }

        let table = match self.load_from_store(source_id).await? {
            Some(bytes) => {
                log::debug!("`{source_id}` found in persistent store");
                self.cache.record(|s| s.store_hits += 1);
                self.parse(source_id, bytes).await?.0
            }
            None => {
                let bytes = self.download(source_id).await?;
                let (table, bytes) = self.parse(source_id, bytes).await?;
                self.save_to_store(source_id, bytes).await?;
                table
            }
        };

        self.cache.install(source_id, table.clone());
        Ok(table)
    }

    /// Re-download `source_id`, overwrite the persistent store and replace the cached table.
    ///
    /// Bytes that fail to download or parse leave both the store and the cached table as they
    /// were.
    pub async fn refresh(&self, source_id: &str) -> Result<Arc<ParsedTable>> {
        let lock = self.cache.source_lock(source_id);
        let _guard = lock.lock().await;

        let bytes = self.download(source_id).await?;
        let (table, bytes) = self.parse(source_id, bytes).await?;
        self.save_to_store(source_id, bytes).await?;
        self.cache.install(source_id, table.clone());
        Ok(table)
    }

    /// Refresh every listed source in order. A failure is counted and logged; the remaining
    /// sources are still refreshed.
    pub async fn refresh_all<S: AsRef<str>>(&self, source_ids: &[S]) -> RefreshSummary {
        let mut summary = RefreshSummary::default();
        for source_id in source_ids {
            let source_id = source_id.as_ref();
            summary.attempted += 1;
            match self.refresh(source_id).await {
                Ok(_) => log::info!("refreshed `{source_id}`"),
                Err(err) => {
                    summary.failures += 1;
                    log::warn!("{err}");
                }
            }
        }
        log::info!(
            "refreshed {} of {} register files",
            summary.attempted - summary.failures,
            summary.attempted
        );
        summary
    }

    async fn download(&self, source_id: &str) -> Result<Vec<u8>> {
        log::info!("downloading `{source_id}`");
        self.cache.record(|s| s.downloads += 1);
        self.fetcher
            .fetch(source_id)
            .await
            .map_err(|err| EngineError::retrieval(source_id, err))
    }

    async fn load_from_store(&self, source_id: &str) -> Result<Option<Vec<u8>>> {
        let store = self.store.clone();
        let key = source_id.to_string();
        tokio::task::spawn_blocking(move || store.get(&key))
            .await?
            .map_err(|err| EngineError::retrieval(source_id, err))
    }

    async fn save_to_store(&self, source_id: &str, bytes: Vec<u8>) -> Result<()> {
        let store = self.store.clone();
        let key = source_id.to_string();
        tokio::task::spawn_blocking(move || store.put(&key, &bytes))
            .await?
            .map_err(|err| EngineError::retrieval(source_id, err))
    }

    /// Parse on the blocking pool. Hands the bytes back so they can be written through.
    async fn parse(
        &self,
        source_id: &str,
        bytes: Vec<u8>,
    ) -> Result<(Arc<ParsedTable>, Vec<u8>)> {
        let parser = self.parser.clone();
        self.cache.record(|s| s.parses += 1);
        let (table, bytes) =
            tokio::task::spawn_blocking(move || parser.parse(&bytes).map(|t| (t, bytes)))
                .await?
                .map_err(|source| EngineError::Parse {
                    source_id: source_id.to_string(),
                    source,
                })?;
        Ok((Arc::new(table), bytes))
    }
}
