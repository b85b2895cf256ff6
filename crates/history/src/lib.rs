//! Conversation history stores for Tasksmith.
//!
//! Both stores implement `tasksmith_core::HistoryStore`:
//! - [`FileHistory`]: a JSON array on disk, rewritten atomically on every change
//! - [`InMemoryHistory`]: for tests and ephemeral sessions

pub mod file_backend;
pub mod in_memory;

pub use file_backend::FileHistory;
pub use in_memory::InMemoryHistory;

use tasksmith_core::history::ConversationRecord;

/// Drop the oldest records until at most `max` remain.
pub(crate) fn evict_oldest(records: &mut Vec<ConversationRecord>, max: usize) {
    if records.len() > max {
        let excess = records.len() - max;
        records.drain(..excess);
    }
}

/// The last `count` records, oldest first.
pub(crate) fn tail(records: &[ConversationRecord], count: usize) -> Vec<ConversationRecord> {
    let start = records.len().saturating_sub(count);
    records[start..].to_vec()
}
