//! Durable storage for downloaded register workbooks.
//!
//! The search engine keeps a parsed copy of every register in memory, but the raw bytes live
//! here so a restart does not have to download every workbook again. Entries are keyed by the
//! source identifier and replaced wholesale by a refresh; there is no expiry.
//!
//! Backends:
//! - [`SqliteByteStore`]: a single SQLite file (the default for long-running processes)
//! - [`DirByteStore`]: one file per source under a directory, written atomically
//! - [`MemoryByteStore`]: process-local, for tests and ephemeral runs
//!
//! [`UploadDecision`] lives here as well because it is purely a function of the stored bytes
//! and the remote file host's content hash.

mod dir;
mod memory;
mod publish;
mod schema;
mod sqlite;

pub use dir::DirByteStore;
pub use memory::MemoryByteStore;
pub use publish::{git_blob_sha1, UploadDecision};
pub use sqlite::{SourceEntry, SqliteByteStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A keyed, durable byte store.
///
/// Implementations are synchronous; async callers are expected to run them on a blocking
/// thread.
pub trait ByteStore: Send + Sync + 'static {
    /// Return the stored bytes for `key`, or `None` if nothing was ever stored.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `bytes` under `key`, replacing any previous value.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Remove `key`. Returns whether an entry existed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// All stored keys, sorted.
    fn keys(&self) -> Result<Vec<String>>;
}
