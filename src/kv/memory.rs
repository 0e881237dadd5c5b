// In-process substrate

use super::{KvStore, validate_key};
use eyre::{Result, eyre};
use std::collections::HashMap;
use std::sync::Mutex;

/// Process-local map; contents vanish with the value
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let entries = self.entries.lock().map_err(|_| eyre!("Memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        validate_key(key)?;
        let mut entries = self.entries.lock().map_err(|_| eyre!("Memory store lock poisoned"))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}
