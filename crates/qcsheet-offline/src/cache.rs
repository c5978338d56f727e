use thiserror::Error;

use crate::request::{Request, Response};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt cache entry for {url}: {reason}")]
    Corrupt { url: String, reason: String },
    #[error("cache task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Persistent, namespaced request → response cache.
///
/// Entries are keyed by method and URL within a namespace. A `put` replaces any previous
/// entry for the same key and opens the namespace if needed. Implementations are synchronous;
/// the controller calls them from blocking tasks.
pub trait ResourceCache: Send + Sync + 'static {
    /// Create `name` if it does not exist yet.
    fn open_namespace(&self, name: &str) -> Result<()>;

    /// All namespaces, sorted.
    fn list_namespaces(&self) -> Result<Vec<String>>;

    /// Remove `name` and everything in it. Returns whether it existed.
    fn delete_namespace(&self, name: &str) -> Result<bool>;

    fn match_request(&self, namespace: &str, request: &Request) -> Result<Option<Response>>;

    fn put(&self, namespace: &str, request: &Request, response: &Response) -> Result<()>;
}
