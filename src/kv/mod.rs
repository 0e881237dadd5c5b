// Key-value persistence substrate

mod file;
mod memory;
mod sqlite;

pub use file::FileKv;
pub use memory::MemoryKv;
pub use sqlite::SqliteKv;

use crate::config::{Backend, Config};
use eyre::{Result, eyre};
use std::future::Future;

const MAX_KEY_LEN: usize = 256;

/// Asynchronous string-keyed storage for whole JSON documents
///
/// Operations have no timeout and cannot be cancelled midway; a backend that
/// hangs hangs the caller.
pub trait KvStore {
    /// Read the value stored under `key`, `None` if it was never written
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Replace the value stored under `key`
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send;
}

pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Storage key cannot be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(eyre!("Storage key too long: {} bytes (max {})", key.len(), MAX_KEY_LEN));
    }
    Ok(())
}

/// Persistent backend chosen by configuration
#[derive(Debug)]
pub enum Substrate {
    Sqlite(SqliteKv),
    Files(FileKv),
}

impl Substrate {
    pub fn open(config: &Config) -> Result<Self> {
        match config.backend {
            Backend::Sqlite => Ok(Substrate::Sqlite(SqliteKv::open(config.data_dir.join("todostore.db"))?)),
            Backend::Files => Ok(Substrate::Files(FileKv::open(&config.data_dir)?)),
        }
    }
}

impl KvStore for Substrate {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            Substrate::Sqlite(kv) => kv.get(key).await,
            Substrate::Files(kv) => kv.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        match self {
            Substrate::Sqlite(kv) => kv.set(key, value).await,
            Substrate::Files(kv) => kv.set(key, value).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("@task_manager/tasks").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key(&"k".repeat(257)).is_err());
        assert!(validate_key(&"k".repeat(256)).is_ok());
    }

    #[tokio::test]
    async fn test_substrate_open_each_backend() {
        for backend in [Backend::Sqlite, Backend::Files] {
            let temp = TempDir::new().unwrap();
            let config = Config {
                data_dir: temp.path().join("data"),
                backend,
            };

            let kv = Substrate::open(&config).unwrap();
            assert_eq!(kv.get("@test/key").await.unwrap(), None);
            kv.set("@test/key", "[1,2]".to_string()).await.unwrap();
            assert_eq!(kv.get("@test/key").await.unwrap().as_deref(), Some("[1,2]"));
            drop(kv);

            let reopened = Substrate::open(&config).unwrap();
            assert_eq!(reopened.get("@test/key").await.unwrap().as_deref(), Some("[1,2]"));
        }
    }
}
