//! The Tasksmith engine.
//!
//! Turns one user message into either a conversational reply or an
//! executed automation task:
//!
//! ```text
//! input ─▶ session merge ─▶ classify ─┬─▶ small talk ───────────────────────────▶ reply
//!                                     └─▶ detail ─┬─▶ clarification ────────────▶ reply
//!                                                 └─▶ match / synthesize ─▶ repair loop ─▶ final reply
//! ```

pub mod chat;
pub mod classifier;
pub mod detail;
pub mod executor;
pub mod llm;
pub mod matcher;
pub mod pipeline;
pub mod prompts;
pub mod repair;
pub mod responder;
pub mod schema;
pub mod synthesizer;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use chat::{SmallTalk, DEFAULT_TONE};
pub use detail::DetailOutcome;
pub use executor::{ExecutionOutcome, Executor};
pub use llm::LlmClient;
pub use matcher::{MatchOutcome, Matcher};
pub use pipeline::{Engine, EngineSettings, Reply, ReplyKind, TaskReport, NOT_UNDERSTOOD};
pub use repair::{LoopReport, LoopState, RepairContext, RepairLoop};
pub use schema::{Intent, SchemaError};
pub use synthesizer::{SelectedUnit, SynthesisError, Synthesizer, UnitSelection};

/// The callable every generated unit must define.
pub const ENTRY_POINT: &str = "main";
