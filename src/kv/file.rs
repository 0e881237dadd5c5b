// Directory-backed substrate: one JSON file per key

use super::{KvStore, validate_key};
use eyre::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const LOCK_FILE: &str = ".lock";

#[derive(Debug, Clone)]
pub struct FileKv {
    base_path: PathBuf,
}

impl FileKv {
    /// Open or create a store directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the document holding `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", encode_key(key)))
    }

    fn lock_file(base_path: &Path) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(base_path.join(LOCK_FILE))
            .context("Failed to open lock file")
    }
}

/// Map a key onto a file stem; bytes outside `[A-Za-z0-9._-]` become `%XX`
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

impl KvStore for FileKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let base_path = self.base_path.clone();
        let path = self.path_for(key);

        tokio::task::spawn_blocking(move || {
            let lock = Self::lock_file(&base_path)?;
            lock.lock_shared().context("Failed to acquire shared lock")?;

            match fs::read_to_string(&path) {
                Ok(value) => Ok(Some(value)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
            }
        })
        .await
        .context("File read task did not complete")?
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        validate_key(key)?;
        let base_path = self.base_path.clone();
        let path = self.path_for(key);

        tokio::task::spawn_blocking(move || {
            let lock = Self::lock_file(&base_path)?;
            lock.lock_exclusive().context("Failed to acquire file lock")?;

            // Write aside and rename so readers never see a partial document
            let tmp_path = path.with_extension("json.tmp");
            let mut file = File::create(&tmp_path).context("Failed to create temp file")?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp_path, &path).with_context(|| format!("Failed to replace {}", path.display()))?;

            debug!(file = ?path, bytes = value.len(), "Wrote document");
            // Lock is released when `lock` is dropped
            Ok(())
        })
        .await
        .context("File write task did not complete")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_encode_key() {
        assert_eq!(encode_key("@task_manager/tasks"), "%40task_manager%2Ftasks");
        assert_eq!(encode_key("plain-key.v1"), "plain-key.v1");
    }

    #[test]
    fn test_encode_key_is_injective_for_lookalikes() {
        assert_ne!(encode_key("a/b"), encode_key("a_b"));
        assert_ne!(encode_key("a%2Fb"), encode_key("a/b"));
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let temp = TempDir::new().unwrap();
        let kv = FileKv::open(temp.path().join("store")).unwrap();
        assert!(kv.base_path().is_dir());
    }

    #[tokio::test]
    async fn test_get_absent_key() {
        let temp = TempDir::new().unwrap();
        let kv = FileKv::open(temp.path()).unwrap();
        assert_eq!(kv.get("@task_manager/tasks").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_writes_document() {
        let temp = TempDir::new().unwrap();
        let kv = FileKv::open(temp.path()).unwrap();

        kv.set("@task_manager/tasks", "[]".to_string()).await.unwrap();
        kv.set("@task_manager/tasks", "[{\"id\":\"a\"}]".to_string()).await.unwrap();

        let path = kv.path_for("@task_manager/tasks");
        assert_eq!(fs::read_to_string(&path).unwrap(), "[{\"id\":\"a\"}]");
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(
            kv.get("@task_manager/tasks").await.unwrap().as_deref(),
            Some("[{\"id\":\"a\"}]")
        );
    }

    #[tokio::test]
    async fn test_keys_do_not_collide() {
        let temp = TempDir::new().unwrap();
        let kv = FileKv::open(temp.path()).unwrap();

        kv.set("@task_manager/tasks", "tasks".to_string()).await.unwrap();
        kv.set("@task_manager/categories", "categories".to_string()).await.unwrap();

        assert_eq!(kv.get("@task_manager/tasks").await.unwrap().as_deref(), Some("tasks"));
        assert_eq!(
            kv.get("@task_manager/categories").await.unwrap().as_deref(),
            Some("categories")
        );
    }
}
