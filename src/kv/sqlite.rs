// SQLite-backed substrate

use super::{KvStore, validate_key};
use eyre::{Context, Result, eyre};
use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// One `kv` table holding each document as a row
#[derive(Debug, Clone)]
pub struct SqliteKv {
    db: Arc<Mutex<Connection>>,
}

impl SqliteKv {
    /// Open or create a database file, creating parent directories as needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let db = Connection::open(path).context("Failed to open SQLite database")?;
        Self::from_connection(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        Self::from_connection(db)
    }

    fn from_connection(db: Connection) -> Result<Self> {
        debug!("Creating kv schema");
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            );
            "#,
        )
        .context("Failed to create kv schema")?;

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    async fn with_db<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let db = db.lock().map_err(|_| eyre!("SQLite connection lock poisoned"))?;
            op(&*db)
        })
        .await
        .context("SQLite task did not complete")?
    }
}

impl KvStore for SqliteKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let key = key.to_string();

        self.with_db(move |db| {
            db.query_row("SELECT value FROM kv WHERE key = ?1", [&key], |row| row.get(0))
                .optional()
                .with_context(|| format!("Failed to read {}", key))
        })
        .await
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        validate_key(key)?;
        let key = key.to_string();

        self.with_db(move |db| {
            db.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                rusqlite::params![&key, &value],
            )
            .with_context(|| format!("Failed to write {}", key))?;
            debug!(key = %key, bytes = value.len(), "Wrote document");
            Ok(())
        })
        .await
    }
}
