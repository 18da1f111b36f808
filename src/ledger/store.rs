use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::common::errors::CaramellaError;

pub const SCORES: &str = "scores";
pub const NAMES: &str = "names";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Unavailable(String),
    #[error("{table}:{key} does not hold an integer")]
    Corrupt { table: String, key: String },
}

impl From<StoreError> for CaramellaError {
    fn from(e: StoreError) -> Self {
        CaramellaError::StoreUnavailable(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Hash-of-strings store, shaped after the Redis commands the scoreboard needs.
///
/// Implementations fail fast; nothing here retries.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Adds `delta` to the integer at `table[key]` (0 if absent) and returns the new value.
    /// Must be atomic per key.
    async fn increment(&self, table: &str, key: &str, delta: i64) -> StoreResult<i64>;

    async fn get(&self, table: &str, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, table: &str, key: &str, value: String) -> StoreResult<()>;

    async fn get_all(&self, table: &str) -> StoreResult<Vec<(String, String)>>;

    /// Durably writes the current state.
    async fn persist(&self) -> StoreResult<()>;
}

type Table = HashMap<String, String>;

/// In-process store with optional JSON snapshots on disk.
pub struct MemoryStore {
    tables: DashMap<String, Table>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            snapshot_path: None,
        }
    }

    /// Opens a store persisted at `path`, loading the last snapshot if there is one.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let tables = DashMap::new();

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let loaded: HashMap<String, Table> = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Unavailable(format!("bad snapshot {:?}: {}", path, e)))?;
                for (name, table) in loaded {
                    tables.insert(name, table);
                }
                info!("Loaded score snapshot from {:?}", path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No score snapshot at {:?}, starting empty", path);
            }
            Err(e) => return Err(StoreError::Unavailable(e.to_string())),
        }

        Ok(Self {
            tables,
            snapshot_path: Some(path),
        })
    }

    fn dump(&self) -> HashMap<String, Table> {
        self.tables
            .iter()
            .map(|t| (t.key().clone(), t.value().clone()))
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn write_atomically(path: &Path, bytes: Vec<u8>) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn increment(&self, table: &str, key: &str, delta: i64) -> StoreResult<i64> {
        let mut table_ref = self.tables.entry(table.to_string()).or_default();
        let current = match table_ref.get(key) {
            Some(raw) => raw.parse::<i64>().map_err(|_| StoreError::Corrupt {
                table: table.to_string(),
                key: key.to_string(),
            })?,
            None => 0,
        };
        let next = current + delta;
        table_ref.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    async fn get(&self, table: &str, key: &str) -> StoreResult<Option<String>> {
        Ok(self.tables.get(table).and_then(|t| t.get(key).cloned()))
    }

    async fn set(&self, table: &str, key: &str, value: String) -> StoreResult<()> {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn get_all(&self, table: &str) -> StoreResult<Vec<(String, String)>> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn persist(&self) -> StoreResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(&self.dump())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        write_atomically(path, bytes)
            .await
            .map_err(|e| StoreError::Unavailable(format!("snapshot to {:?}: {}", path, e)))?;
        debug!("Score snapshot written to {:?}", path);
        Ok(())
    }
}
