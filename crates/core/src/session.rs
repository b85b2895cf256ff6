//! Per-conversation session state.
//!
//! A session owns the clarification state machine. At most one clarification
//! can be pending; the next user input consumes it unconditionally by merging
//! the texts, and the merged text re-enters the pipeline from the top.
//!
//! ```text
//!   Idle ──request_clarification──▶ AwaitingDetail
//!    ▲                                   │
//!    └────────────merge_input────────────┘
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A pending "needs more input" request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingClarification {
    /// The (possibly already merged) input that was underspecified
    pub original_input: String,

    /// What the assistant asked for
    pub requested_detail: String,
}

/// Observable clarification state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarificationState {
    Idle,
    AwaitingDetail,
}

/// State carried between turns of one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session ID
    pub id: String,

    /// Clarification waiting to be answered, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingClarification>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            pending: None,
        }
    }

    pub fn state(&self) -> ClarificationState {
        if self.pending.is_some() {
            ClarificationState::AwaitingDetail
        } else {
            ClarificationState::Idle
        }
    }

    /// Record a clarification request. A request already pending is
    /// overwritten (last write wins).
    pub fn request_clarification(
        &mut self,
        original_input: impl Into<String>,
        requested_detail: impl Into<String>,
    ) {
        if self.pending.is_some() {
            tracing::debug!(session = %self.id, "Overwriting pending clarification");
        }
        self.pending = Some(PendingClarification {
            original_input: original_input.into(),
            requested_detail: requested_detail.into(),
        });
    }

    /// Consume any pending clarification, producing the input the pipeline
    /// should classify: `original \n detail \n next`, or `next` unchanged.
    pub fn merge_input(&mut self, next: &str) -> String {
        match self.pending.take() {
            Some(p) => format!("{}\n{}\n{}", p.original_input, p.requested_detail, next),
            None => next.to_string(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_idle() {
        let session = Session::new();
        assert_eq!(session.state(), ClarificationState::Idle);
    }

    #[test]
    fn merge_without_pending_is_identity() {
        let mut session = Session::new();
        assert_eq!(session.merge_input("hello"), "hello");
        assert_eq!(session.state(), ClarificationState::Idle);
    }

    #[test]
    fn pending_is_consumed_exactly_once() {
        let mut session = Session::new();
        session.request_clarification("list my files", "which folder?");
        assert_eq!(session.state(), ClarificationState::AwaitingDetail);

        let merged = session.merge_input("the Downloads folder");
        assert_eq!(merged, "list my files\nwhich folder?\nthe Downloads folder");
        assert_eq!(session.state(), ClarificationState::Idle);

        // Second input passes through untouched
        assert_eq!(session.merge_input("again"), "again");
    }

    #[test]
    fn second_request_overwrites_first() {
        let mut session = Session::new();
        session.request_clarification("a", "first?");
        session.request_clarification("b", "second?");
        assert_eq!(session.merge_input("c"), "b\nsecond?\nc");
    }
}
