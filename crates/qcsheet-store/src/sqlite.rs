use crate::{schema, ByteStore, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Metadata about a stored source, without its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub key: String,
    pub byte_len: u64,
    /// Hex SHA-256 of the stored bytes. `None` for rows written before hashes were tracked.
    pub sha256: Option<String>,
    /// SQLite `CURRENT_TIMESTAMP` text (UTC, `YYYY-MM-DD HH:MM:SS`).
    pub stored_at: String,
}

#[derive(Debug, Clone)]
pub struct SqliteByteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteByteStore {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    /// Open a SQLite URI, e.g. `file:registers?mode=memory&cache=shared` so several handles can
    /// share one in-memory database.
    pub fn open_uri(uri: &str) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI;
        let conn = Connection::open_with_flags(uri, flags)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn entry(&self, key: &str) -> Result<Option<SourceEntry>> {
        let conn = self.conn.lock().expect("byte store mutex poisoned");
        let entry = conn
            .query_row(
                "SELECT key, byte_len, sha256, stored_at FROM source_files WHERE key = ?1",
                params![key],
                |r| {
                    Ok(SourceEntry {
                        key: r.get(0)?,
                        byte_len: r.get(1)?,
                        sha256: r.get(2)?,
                        stored_at: r.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }
}

impl ByteStore for SqliteByteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn.lock().expect("byte store mutex poisoned");
        let bytes = conn
            .query_row(
                "SELECT bytes FROM source_files WHERE key = ?1",
                params![key],
                |r| r.get::<_, Vec<u8>>(0),
            )
            .optional()?;
        Ok(bytes)
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let sha256 = hex::encode(Sha256::digest(bytes));
        let conn = self.conn.lock().expect("byte store mutex poisoned");
        conn.execute(
            r#"
            INSERT INTO source_files (key, bytes, byte_len, sha256, stored_at)
            VALUES (?1, ?2, ?3, ?4, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET
              bytes = excluded.bytes,
              byte_len = excluded.byte_len,
              sha256 = excluded.sha256,
              stored_at = excluded.stored_at
            "#,
            params![key, bytes, bytes.len() as i64, sha256],
        )?;
        log::debug!("stored {} bytes for `{key}`", bytes.len());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("byte store mutex poisoned");
        let removed = conn.execute("DELETE FROM source_files WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().expect("byte store mutex poisoned");
        let mut stmt = conn.prepare("SELECT key FROM source_files ORDER BY key")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for key in rows {
            keys.push(key?);
        }
        Ok(keys)
    }
}
