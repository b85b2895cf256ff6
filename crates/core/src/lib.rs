//! # Tasksmith Core
//!
//! Domain types, traits, and error definitions for the Tasksmith assistant.
//! This crate has **zero framework dependencies**: it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the task engine is defined as a trait here:
//! the LLM ([`Provider`]), the conversation log ([`HistoryStore`]) and the
//! code execution backend ([`CodeRunner`]). Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with scripted stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod history;
pub mod library;
pub mod runner;
pub mod session;
pub mod persona;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use history::{ConversationRecord, HistoryStore, HistorySummary, RecordKind};
pub use library::{LibraryEntry, UnitMetadata};
pub use runner::CodeRunner;
pub use session::{ClarificationState, PendingClarification, Session};
pub use persona::Persona;
pub use event::{DomainEvent, EventBus, Stage};
