use std::path::{Path, PathBuf};
use std::sync::Arc;

use qcsheet_net::{FetchError, DEFAULT_MAX_BODY_BYTES};
use qcsheet_store::{ByteStore, DirByteStore, MemoryByteStore, SqliteByteStore, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::engine::SearchEngine;
use crate::fetch::HttpFetcher;
use crate::lookup::RegistryCatalog;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("maxBodyBytes must be greater than zero")]
    ZeroBodyLimit,
    #[error("failed to open register store: {0}")]
    Store(#[from] StoreError),
    #[error("failed to build HTTP client: {0}")]
    Fetch(#[from] FetchError),
}

/// Where downloaded register bytes are kept between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StoreBackend {
    Sqlite { path: PathBuf },
    Directory { path: PathBuf },
    Memory,
}

impl Default for StoreBackend {
    fn default() -> Self {
        StoreBackend::Sqlite {
            path: PathBuf::from("registers.sqlite"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Base that relative source ids are resolved against. Without one, source ids must be
    /// absolute URLs.
    pub base_url: Option<Url>,
    pub store: StoreBackend,
    pub max_body_bytes: usize,
    pub catalog: RegistryCatalog,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            store: StoreBackend::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            catalog: RegistryCatalog::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::ZeroBodyLimit);
        }
        Ok(())
    }

    pub fn open_store(&self) -> Result<Arc<dyn ByteStore>, ConfigError> {
        let store: Arc<dyn ByteStore> = match &self.store {
            StoreBackend::Sqlite { path } => Arc::new(SqliteByteStore::open_path(path)?),
            StoreBackend::Directory { path } => Arc::new(DirByteStore::new(path)),
            StoreBackend::Memory => Arc::new(MemoryByteStore::new()),
        };
        Ok(store)
    }

    /// An engine fetching over HTTP with the configured store.
    pub fn build_engine(&self) -> Result<SearchEngine, ConfigError> {
        self.validate()?;
        let fetcher = HttpFetcher::new(self.base_url.clone())?
            .with_max_body_bytes(self.max_body_bytes);
        Ok(SearchEngine::new(Arc::new(fetcher), self.open_store()?))
    }
}
