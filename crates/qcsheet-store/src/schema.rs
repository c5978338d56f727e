use rusqlite::Connection;

pub(crate) fn init(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS source_files (
          key TEXT PRIMARY KEY,
          bytes BLOB NOT NULL,
          byte_len INTEGER NOT NULL,
          sha256 TEXT,
          stored_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )
}
