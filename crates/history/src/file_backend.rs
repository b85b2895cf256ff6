//! File-based history: a bounded JSON array on disk.
//!
//! Records are loaded once on open and the whole file is rewritten on every
//! mutation (append, clear). Writes go to a sibling temp file which is then
//! renamed over the original, so a crash mid-write never leaves a truncated
//! history behind.
//!
//! Storage location: `~/.tasksmith/history.json`

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tasksmith_core::error::HistoryError;
use tasksmith_core::history::{ConversationRecord, HistoryStore};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A file-backed history store.
pub struct FileHistory {
    path: PathBuf,
    max_records: usize,
    records: RwLock<Vec<ConversationRecord>>,
}

impl FileHistory {
    /// Open the history at `path`.
    ///
    /// A missing file starts empty (created on first write). An unreadable
    /// or corrupt file is logged and also starts empty. Files holding more
    /// than `max_records` are trimmed in memory on load.
    pub fn open(path: impl Into<PathBuf>, max_records: usize) -> Self {
        let path = path.into();
        let max_records = max_records.max(1);
        let mut records = Self::load_from_disk(&path);
        crate::evict_oldest(&mut records, max_records);
        debug!(path = %path.display(), count = records.len(), "File history loaded");
        Self {
            path,
            max_records,
            records: RwLock::new(records),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Vec<ConversationRecord> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read history, starting empty");
                return Vec::new();
            }
        };

        if content.trim().is_empty() {
            return Vec::new();
        }

        match serde_json::from_str::<Vec<ConversationRecord>>(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt history file, starting empty");
                Vec::new()
            }
        }
    }

    /// Rewrite the whole file via temp + rename.
    async fn flush(&self, records: &[ConversationRecord]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                HistoryError::Storage(format!("Failed to create history directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(records)
            .map_err(|e| HistoryError::Storage(format!("Failed to serialize history: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to write history file: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to replace history file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl HistoryStore for FileHistory {
    fn name(&self) -> &str {
        "file"
    }

    fn max_records(&self) -> usize {
        self.max_records
    }

    async fn append(&self, record: ConversationRecord) -> Result<(), HistoryError> {
        let mut records = self.records.write().await;
        let mut next = records.clone();
        next.push(record);
        crate::evict_oldest(&mut next, self.max_records);
        self.flush(&next).await?;
        *records = next;
        Ok(())
    }

    async fn recent(&self, count: usize) -> Vec<ConversationRecord> {
        crate::tail(&self.records.read().await, count)
    }

    async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    async fn clear(&self) -> Result<(), HistoryError> {
        let mut records = self.records.write().await;
        self.flush(&[]).await?;
        records.clear();
        Ok(())
    }
}
