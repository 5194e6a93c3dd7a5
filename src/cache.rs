//! Key/value cache stores for classification results
//!
//! `get` returns whatever is stored; freshness is decided by the caller
//! (see [`is_fresh`]).

use crate::types::{ClassificationResult, EpochMillis};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Persistence seam; no transactional guarantees
#[async_trait]
pub trait CacheStore<V>: Send + Sync
where
    V: Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>>;
    async fn set(&self, key: &str, value: V) -> Result<()>;
}

/// Cache key for a tab's classification
pub fn classification_key(tab_id: &str) -> String {
    format!("classification:{}", tab_id)
}

/// Whether a cached result is young enough to reuse
pub fn is_fresh(result: &ClassificationResult, now: EpochMillis, ttl: Duration) -> bool {
    let age_ms = now.as_millis().saturating_sub(result.metadata.classified_at.as_millis());
    i128::from(age_ms) < ttl.as_millis() as i128
}

/// Process-local cache
pub struct MemoryCache<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> CacheStore<V> for MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: V) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Cache persisted as a single JSON object on disk.
///
/// The file is read on first access and rewritten on every `set`.
pub struct JsonFileCache<V> {
    path: PathBuf,
    entries: Mutex<Option<HashMap<String, V>>>,
}

impl<V> JsonFileCache<V>
where
    V: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(None),
        }
    }

    async fn read_file(&self) -> Result<HashMap<String, V>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!("No cache file at {}, starting empty", self.path.display());
            return Ok(HashMap::new());
        }
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .context("failed to read cache file")?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    "Unreadable cache file {} ({}), starting empty",
                    self.path.display(),
                    e
                );
                Ok(HashMap::new())
            }
        }
    }

    async fn write_file(&self, entries: &HashMap<String, V>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("failed to create cache directory")?;
            }
        }
        let content = serde_json::to_string_pretty(entries).context("failed to serialize cache")?;

        // the cache file is only ever replaced whole
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);
        tokio::fs::write(&tmp_path, content)
            .await
            .context("failed to write temporary cache file")?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .context("failed to replace cache file")
    }
}

#[async_trait]
impl<V> CacheStore<V> for JsonFileCache<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<Option<V>> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_file().await?);
        }
        Ok(guard.as_ref().and_then(|entries| entries.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: V) -> Result<()> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_file().await?);
        }
        let entries = guard.get_or_insert_with(HashMap::new);
        entries.insert(key.to_string(), value);
        self.write_file(entries).await
    }
}
