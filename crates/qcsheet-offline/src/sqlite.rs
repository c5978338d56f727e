use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};

use crate::cache::{CacheError, ResourceCache, Result};
use crate::request::{Request, Response, ResponseKind};

/// Resource cache in a single SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteResourceCache {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteResourceCache {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS cache_namespaces (
          name TEXT PRIMARY KEY,
          created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS cached_responses (
          namespace TEXT NOT NULL,
          method TEXT NOT NULL,
          url TEXT NOT NULL,
          status INTEGER NOT NULL,
          status_text TEXT NOT NULL,
          headers TEXT NOT NULL,
          body BLOB NOT NULL,
          kind TEXT NOT NULL,
          stored_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
          PRIMARY KEY (namespace, method, url)
        );
        "#,
    )
}

impl ResourceCache for SqliteResourceCache {
    fn open_namespace(&self, name: &str) -> Result<()> {
        let conn = self.conn.lock().expect("resource cache mutex poisoned");
        conn.execute(
            "INSERT OR IGNORE INTO cache_namespaces (name) VALUES (?1)",
            params![name],
        )?;
        Ok(())
    }

    fn list_namespaces(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().expect("resource cache mutex poisoned");
        let mut stmt = conn.prepare("SELECT name FROM cache_namespaces ORDER BY name")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;

        let mut names = Vec::new();
        for name in rows {
            names.push(name?);
        }
        Ok(names)
    }

    fn delete_namespace(&self, name: &str) -> Result<bool> {
        let mut conn = self.conn.lock().expect("resource cache mutex poisoned");
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM cached_responses WHERE namespace = ?1",
            params![name],
        )?;
        let removed = tx.execute("DELETE FROM cache_namespaces WHERE name = ?1", params![name])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn match_request(&self, namespace: &str, request: &Request) -> Result<Option<Response>> {
        let conn = self.conn.lock().expect("resource cache mutex poisoned");
        let row = conn
            .query_row(
                r#"
                SELECT status, status_text, headers, body, kind
                FROM cached_responses
                WHERE namespace = ?1 AND method = ?2 AND url = ?3
                "#,
                params![namespace, request.method.as_str(), request.url.as_str()],
                |r| {
                    Ok((
                        r.get::<_, u16>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, String>(2)?,
                        r.get::<_, Vec<u8>>(3)?,
                        r.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((status, status_text, headers, body, kind)) = row else {
            return Ok(None);
        };
        let corrupt = |reason: String| CacheError::Corrupt {
            url: request.url.to_string(),
            reason,
        };
        let headers: Vec<(String, String)> =
            serde_json::from_str(&headers).map_err(|err| corrupt(err.to_string()))?;
        let kind =
            ResponseKind::parse(&kind).ok_or_else(|| corrupt(format!("unknown kind `{kind}`")))?;

        Ok(Some(Response {
            status,
            status_text,
            headers,
            body,
            kind,
        }))
    }

    fn put(&self, namespace: &str, request: &Request, response: &Response) -> Result<()> {
        let headers = serde_json::to_string(&response.headers).map_err(|err| {
            CacheError::Corrupt {
                url: request.url.to_string(),
                reason: err.to_string(),
            }
        })?;

        let mut conn = self.conn.lock().expect("resource cache mutex poisoned");
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO cache_namespaces (name) VALUES (?1)",
            params![namespace],
        )?;
        tx.execute(
            r#"
            INSERT INTO cached_responses
              (namespace, method, url, status, status_text, headers, body, kind, stored_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, CURRENT_TIMESTAMP)
            ON CONFLICT(namespace, method, url) DO UPDATE SET
              status = excluded.status,
              status_text = excluded.status_text,
              headers = excluded.headers,
              body = excluded.body,
              kind = excluded.kind,
              stored_at = excluded.stored_at
            "#,
            params![
                namespace,
                request.method.as_str(),
                request.url.as_str(),
                response.status,
                response.status_text,
                headers,
                response.body,
                response.kind.as_str(),
            ],
        )?;
        tx.commit()?;
        log::debug!(
            "cached {} {} ({} bytes) in `{namespace}`",
            request.method,
            request.url,
            response.body.len()
        );
        Ok(())
    }
}
