//! In-memory history: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use tasksmith_core::error::HistoryError;
use tasksmith_core::history::{ConversationRecord, HistoryStore};
use tokio::sync::RwLock;

/// A bounded history kept in a Vec.
pub struct InMemoryHistory {
    max_records: usize,
    records: RwLock<Vec<ConversationRecord>>,
}

impl InMemoryHistory {
    pub fn new(max_records: usize) -> Self {
        Self {
            max_records: max_records.max(1),
            records: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new(10)
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn max_records(&self) -> usize {
        self.max_records
    }

    async fn append(&self, record: ConversationRecord) -> Result<(), HistoryError> {
        let mut records = self.records.write().await;
        records.push(record);
        crate::evict_oldest(&mut records, self.max_records);
        Ok(())
    }

    async fn recent(&self, count: usize) -> Vec<ConversationRecord> {
        crate::tail(&self.records.read().await, count)
    }

    async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    async fn clear(&self) -> Result<(), HistoryError> {
        self.records.write().await.clear();
        Ok(())
    }
}
