//! History trait: the bounded log of completed exchanges.
//!
//! Every completed exchange (a chat reply or a finished automation task)
//! becomes an immutable [`ConversationRecord`]. Stores keep only the most
//! recent N records; appending past the bound evicts the oldest (FIFO).
//! Recent records are replayed to the LLM as ordered context.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::HistoryError;
use crate::message::Message;

/// What kind of exchange produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Conversational reply
    Chat,
    /// An automation task that ran generated code
    CodeExecution,
    /// An image description exchange
    ImageAnalysis,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Chat => write!(f, "chat"),
            RecordKind::CodeExecution => write!(f, "code_execution"),
            RecordKind::ImageAnalysis => write!(f, "image_analysis"),
        }
    }
}

/// A single completed exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// When the exchange completed
    pub timestamp: DateTime<Utc>,

    /// Which pipeline branch produced it
    #[serde(rename = "type")]
    pub kind: RecordKind,

    /// The (merged) user input
    pub user_input: String,

    /// What the assistant finally said
    pub assistant_response: String,

    /// Task metadata (task summary, unit name, raw output, ...)
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ConversationRecord {
    /// Create a record stamped with the current time.
    pub fn new(
        kind: RecordKind,
        user_input: impl Into<String>,
        assistant_response: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            user_input: user_input.into(),
            assistant_response: assistant_response.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Per-kind record counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total: usize,
    pub chat: usize,
    pub code_execution: usize,
    pub image_analysis: usize,
}

impl HistorySummary {
    /// Count records by kind.
    pub fn from_records(records: &[ConversationRecord]) -> Self {
        let count = |kind| records.iter().filter(|r| r.kind == kind).count();
        Self {
            total: records.len(),
            chat: count(RecordKind::Chat),
            code_execution: count(RecordKind::CodeExecution),
            image_analysis: count(RecordKind::ImageAnalysis),
        }
    }
}

impl std::fmt::Display for HistorySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.total == 0 {
            return write!(f, "No history yet");
        }
        write!(
            f,
            "Total records: {}, chat: {}, code execution: {}, image analysis: {}",
            self.total, self.chat, self.code_execution, self.image_analysis
        )
    }
}

/// Replay records as alternating user/assistant messages, oldest first.
pub fn records_to_context(records: &[ConversationRecord]) -> Vec<Message> {
    records
        .iter()
        .flat_map(|r| {
            [
                Message::user(&r.user_input),
                Message::assistant(&r.assistant_response),
            ]
        })
        .collect()
}

/// The core HistoryStore trait.
///
/// Implementations: JSON file (rewritten in full on every append) and
/// in-memory (for tests and ephemeral sessions).
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The backend name (e.g., "file", "in_memory").
    fn name(&self) -> &str;

    /// The configured bound on retained records.
    fn max_records(&self) -> usize;

    /// Append a record, evicting the oldest ones past the bound.
    async fn append(&self, record: ConversationRecord) -> std::result::Result<(), HistoryError>;

    /// The most recent `count` records, oldest first.
    async fn recent(&self, count: usize) -> Vec<ConversationRecord>;

    /// Total retained records.
    async fn len(&self) -> usize;

    /// Remove every record.
    async fn clear(&self) -> std::result::Result<(), HistoryError>;

    /// All retained records, oldest first.
    async fn all(&self) -> Vec<ConversationRecord> {
        self.recent(self.max_records()).await
    }

    /// Per-kind record counts.
    async fn summary(&self) -> HistorySummary {
        HistorySummary::from_records(&self.all().await)
    }

    /// The most recent `count` records as LLM context messages.
    async fn as_context(&self, count: usize) -> Vec<Message> {
        records_to_context(&self.recent(count).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn record_serializes_kind_under_type() {
        let record = ConversationRecord::new(RecordKind::CodeExecution, "list files", "Done!")
            .with_metadata("function_name", "list_files");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "code_execution");
        assert_eq!(json["metadata"]["function_name"], "list_files");
    }

    #[test]
    fn record_parses_without_metadata() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00Z","type":"chat","user_input":"hi","assistant_response":"hello"}"#;
        let record: ConversationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind, RecordKind::Chat);
        assert!(record.metadata.is_empty());
    }

    #[test]
    fn summary_counts_by_kind() {
        let records = vec![
            ConversationRecord::new(RecordKind::Chat, "a", "b"),
            ConversationRecord::new(RecordKind::CodeExecution, "c", "d"),
            ConversationRecord::new(RecordKind::Chat, "e", "f"),
        ];
        let summary = HistorySummary::from_records(&records);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.chat, 2);
        assert_eq!(summary.code_execution, 1);
        assert_eq!(summary.image_analysis, 0);
        assert!(summary.to_string().contains("Total records: 3"));
    }

    #[test]
    fn empty_summary_display() {
        assert_eq!(HistorySummary::default().to_string(), "No history yet");
    }

    #[test]
    fn context_alternates_roles() {
        let records = vec![
            ConversationRecord::new(RecordKind::Chat, "first", "one"),
            ConversationRecord::new(RecordKind::Chat, "second", "two"),
        ];
        let msgs = records_to_context(&records);
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[0].role, Role::User);
        assert_eq!(msgs[0].content, "first");
        assert_eq!(msgs[1].role, Role::Assistant);
        assert_eq!(msgs[3].content, "two");
    }
}
