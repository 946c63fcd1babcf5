//! Per-user classification history.
//!
//! The pipeline only writes; storage and retrieval belong to the sink.

use crate::classifier::ProbabilityPair;
use crate::decision::Label;
use crate::error::{LafalError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Outcome handed to the store; the store adds identity and timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryEntry {
    pub label: Label,
    pub confidence: ProbabilityPair,
}

/// One persisted classification outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub user_id: String,
    #[serde(rename = "result")]
    pub label: Label,
    pub confidence: ProbabilityPair,
    pub timestamp: DateTime<Utc>,
}

/// Write sink for classification outcomes, keyed by user identity.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist `entry` under `user_id`, stamping it with the store's clock.
    async fn append(&self, user_id: &str, entry: HistoryEntry) -> Result<HistoryRecord>;
}

fn stamp(user_id: &str, entry: HistoryEntry) -> HistoryRecord {
    HistoryRecord {
        user_id: user_id.to_string(),
        label: entry.label,
        confidence: entry.confidence,
        timestamp: Utc::now(),
    }
}

/// Appends records as JSON lines to a single file.
pub struct JsonlHistoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlHistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl HistoryStore for JsonlHistoryStore {
    async fn append(&self, user_id: &str, entry: HistoryEntry) -> Result<HistoryRecord> {
        let persistence = |e: std::io::Error| LafalError::Persistence {
            message: format!("{}: {}", self.path.display(), e),
        };

        let record = stamp(user_id, entry);
        let mut line = serde_json::to_string(&record).map_err(|e| LafalError::Persistence {
            message: format!("Failed to serialize history record: {e}"),
        })?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(persistence)?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(persistence)?;
        file.write_all(line.as_bytes()).await.map_err(persistence)?;
        file.flush().await.map_err(persistence)?;

        tracing::debug!(user = %user_id, result = %record.label, "History record written");
        Ok(record)
    }
}

/// In-process store, for tests and local runs without persistence.
#[derive(Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<HistoryRecord>>,
    should_fail: AtomicBool,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent write.
    pub fn failing() -> Self {
        let store = Self::default();
        store.should_fail.store(true, Ordering::SeqCst);
        store
    }

    pub async fn records(&self) -> Vec<HistoryRecord> {
        self.records.lock().await.clone()
    }

    pub async fn records_for(&self, user_id: &str) -> Vec<HistoryRecord> {
        self.records
            .lock()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, user_id: &str, entry: HistoryEntry) -> Result<HistoryRecord> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(LafalError::Persistence {
                message: "history store unavailable".to_string(),
            });
        }
        let record = stamp(user_id, entry);
        self.records.lock().await.push(record.clone());
        Ok(record)
    }
}
