//! Asset and record storage ports

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::StorageError;

/// File storage port
#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Store `content` under a relative `path`, returning the stored location
    async fn save(&self, path: &str, content: &[u8]) -> Result<String, StorageError>;
}

/// Assets as files below a root directory
pub struct FilesystemAssetStorage {
    root: PathBuf,
}

impl FilesystemAssetStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        check_relative_path(path)?;
        Ok(self.root.join(path))
    }
}

/// Reject paths that are empty, absolute or climb out of the storage root
pub fn check_relative_path(path: &str) -> Result<(), StorageError> {
    let escapes = Path::new(path)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if path.is_empty() || escapes {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}

#[async_trait]
impl AssetStorage for FilesystemAssetStorage {
    async fn save(&self, path: &str, content: &[u8]) -> Result<String, StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, content).await?;
        tracing::debug!("Stored asset {} ({} bytes)", target.display(), content.len());
        Ok(path.to_string())
    }
}

/// A structured record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    /// Record class, as configured on the output
    pub class: String,
    /// Folder the record is filed under
    pub path: String,
    pub key: String,
    pub values: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

/// Structured record port
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a record, returning its id
    async fn save(&self, record: Record) -> Result<String, StorageError>;
}

#[derive(Default)]
pub struct InMemoryRecordStore {
    records: DashMap<String, Record>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Record> {
        self.records.get(id).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn save(&self, record: Record) -> Result<String, StorageError> {
        let id = record.id.clone();
        self.records.insert(id.clone(), record);
        Ok(id)
    }
}

/// Appends one JSON document per record to a file
pub struct JsonLinesRecordStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLinesRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl RecordStore for JsonLinesRecordStore {
    async fn save(&self, record: Record) -> Result<String, StorageError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(record.id)
    }
}
