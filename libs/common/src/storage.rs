//! Local key-value storage for the ASCII converter client
//!
//! This module provides the small persisted key-value store the client keeps
//! its preferences in, with a JSON file backend for real use and an
//! in-memory backend for tests.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

/// Configuration for the file-backed store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the JSON document holding all entries
    pub path: PathBuf,
}

impl StoreConfig {
    /// Use `path` when given, the default location otherwise
    pub fn resolve(path: Option<PathBuf>) -> StoreResult<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        Ok(StoreConfig { path })
    }

    /// Default state file location under the user's config directory
    pub fn default_path() -> StoreResult<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| {
            StoreError::Configuration("no configuration directory for this user".to_string())
        })?;
        Ok(base.join("ascii-converter").join("state.json"))
    }
}

/// String key-value store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Set a key-value pair, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete a key; deleting a missing key is not an error
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// Key-value store persisted as a single JSON object on disk
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Open a store at the configured path. The file is created lazily on
    /// the first write.
    pub fn new(config: &StoreConfig) -> Self {
        info!("Key-value store backed by {}", config.path.display());
        FileStore {
            path: config.path.clone(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> StoreResult<BTreeMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) if raw.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_entries(&self, entries: &BTreeMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write-then-rename so a crash never leaves a truncated document.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(entries)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let _guard = self.lock.lock().await;
        let entries = self.read_entries().await?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries).await?;
        debug!("Stored key {}", key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries).await?;
        }
        Ok(())
    }
}

/// In-memory store, used by tests and when no state file is wanted
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
