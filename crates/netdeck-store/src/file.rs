//! JSON file backend
//!
//! Keeps every record in `<state_dir>/store.json`, with the previous
//! generation kept as `store.json.backup`. Writers take an exclusive lock on
//! `store.lock`, so several processes can share one state directory. A new
//! generation is written to a temp file and renamed into place, so readers
//! always see a complete document.

use crate::backend::KvStore;
use crate::error::{Result, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

const STORE_VERSION: u32 = 1;
const STORE_FILE: &str = "store.json";
const STORE_BACKUP: &str = "store.json.backup";
const STORE_TEMP: &str = "store.json.tmp";
const STORE_LOCK: &str = "store.lock";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    updated_at: DateTime<Utc>,
    records: BTreeMap<String, String>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            updated_at: Utc::now(),
            records: BTreeMap::new(),
        }
    }
}

/// Exclusive lock on the state directory, released on drop
struct WriteLock {
    file: std::fs::File,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// File-backed store
pub struct FileStore {
    state_dir: PathBuf,
    // in-process writers queue here before contending for the file lock
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            state_dir: state_dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn store_path(&self) -> PathBuf {
        self.state_dir.join(STORE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir.join(STORE_BACKUP)
    }

    fn unavailable(path: &Path, e: impl std::fmt::Display) -> StoreError {
        StoreError::Unavailable(format!("{}: {}", path.display(), e))
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.state_dir)
            .await
            .map_err(|e| Self::unavailable(&self.state_dir, e))
    }

    async fn lock(&self) -> Result<WriteLock> {
        self.ensure_state_dir().await?;
        let path = self.state_dir.join(STORE_LOCK);
        tokio::task::spawn_blocking(move || {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)
                .map_err(|e| Self::unavailable(&path, e))?;
            FileExt::lock_exclusive(&file).map_err(|e| Self::unavailable(&path, e))?;
            Ok(WriteLock { file })
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("store lock task failed: {}", e)))?
    }

    /// Read the current generation, falling back to the backup when the
    /// main file is missing
    async fn load(&self) -> Result<StoreDocument> {
        let path = self.store_path();
        let source = if path.exists() {
            path
        } else if self.backup_path().exists() {
            tracing::warn!(path = %path.display(), "Store file missing, reading backup");
            self.backup_path()
        } else {
            tracing::debug!("Store file not found, starting empty");
            return Ok(StoreDocument::default());
        };

        let content = fs::read_to_string(&source)
            .await
            .map_err(|e| Self::unavailable(&source, e))?;
        let doc: StoreDocument = serde_json::from_str(&content)?;

        if doc.version > STORE_VERSION {
            return Err(StoreError::StateError(format!(
                "store file version {} is newer than supported version {}",
                doc.version, STORE_VERSION
            )));
        }
        Ok(doc)
    }

    /// Write a new generation; callers hold the write lock
    async fn save(&self, doc: &mut StoreDocument) -> Result<()> {
        let path = self.store_path();
        if path.exists() {
            fs::copy(&path, self.backup_path()).await?;
        }

        doc.updated_at = Utc::now();
        let content = serde_json::to_string_pretty(doc)?;
        let temp = self.state_dir.join(STORE_TEMP);
        fs::write(&temp, content)
            .await
            .map_err(|e| Self::unavailable(&temp, e))?;
        fs::rename(&temp, &path)
            .await
            .map_err(|e| Self::unavailable(&path, e))?;

        tracing::debug!(records = doc.records.len(), "Saved store");
        Ok(())
    }

    /// Read-modify-write under both the in-process and the file lock
    async fn update<F, T>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut StoreDocument) -> Option<T>,
        T: Default,
    {
        let _guard = self.write_lock.lock().await;
        let _lock = self.lock().await?;
        let mut doc = self.load().await?;
        match change(&mut doc) {
            Some(value) => {
                self.save(&mut doc).await?;
                Ok(value)
            }
            None => Ok(T::default()),
        }
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load().await?.records.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.update(|doc| {
            doc.records.insert(key.to_string(), value);
            Some(())
        })
        .await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let doc = self.load().await?;
        Ok(doc
            .records
            .into_iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.update(|doc| doc.records.remove(key).map(|_| true))
            .await
    }
}
