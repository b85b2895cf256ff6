//! Code synthesis and validation.
//!
//! Validation happens locally, in order, before anything is written:
//! structure, non-empty name and code, syntax, entry point. Only a unit
//! that passes every check is published to the library.

use chrono::Utc;
use std::sync::Arc;
use tasksmith_core::error::{LibraryError, ProviderError, RunnerError};
use tasksmith_core::event::{DomainEvent, EventBus};
use tasksmith_core::runner::CodeRunner;
use tasksmith_library::LibraryStore;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm::LlmClient;
use crate::prompts;
use crate::repair::RepairContext;
use crate::schema::{parse_structured, SchemaError, SynthesizedUnit};
use crate::ENTRY_POINT;

/// Why a synthesis attempt produced nothing.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("code generation call failed: {0}")]
    Llm(#[from] ProviderError),

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("generated unit is incomplete: {0}")]
    Incomplete(String),

    #[error("generated code has a syntax error: {reason}")]
    Syntax { reason: String, code: String },

    #[error("generated code does not define `{entry}`")]
    MissingEntryPoint { entry: String, code: String },

    #[error("failed to save generated unit: {0}")]
    Persist(#[from] LibraryError),
}

impl SynthesisError {
    /// Code the model produced but validation rejected, if any.
    pub fn rejected_code(&self) -> Option<&str> {
        match self {
            Self::Syntax { code, .. } | Self::MissingEntryPoint { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// A unit chosen for execution, with the arguments to call it with.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedUnit {
    pub stem: String,
    pub function_name: String,
    pub args: Vec<serde_json::Value>,
}

/// What the repair loop starts from.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitSelection {
    Ready(SelectedUnit),
    /// Synthesis failed before any unit existed. `rejected_code` is
    /// whatever the model wrote, empty when it wrote nothing usable.
    Unavailable { error: String, rejected_code: String },
}

impl UnitSelection {
    pub fn unavailable(error: &SynthesisError) -> Self {
        Self::Unavailable {
            error: error.to_string(),
            rejected_code: error.rejected_code().unwrap_or_default().to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Synthesizer {
    llm: Arc<LlmClient>,
    library: Arc<LibraryStore>,
    runner: Arc<dyn CodeRunner>,
    events: Arc<EventBus>,
    time_budget_secs: u64,
}

impl Synthesizer {
    pub fn new(
        llm: Arc<LlmClient>,
        library: Arc<LibraryStore>,
        runner: Arc<dyn CodeRunner>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            llm,
            library,
            runner,
            events,
            time_budget_secs: 20,
        }
    }

    /// Execution time budget stated in the generation prompt.
    pub fn with_time_budget(mut self, secs: u64) -> Self {
        self.time_budget_secs = secs;
        self
    }

    /// The full generation instruction, including repair context.
    pub fn instruction(&self, task_summary: &str, repair: Option<&RepairContext>) -> String {
        let mut instruction = prompts::code_generation(task_summary, self.time_budget_secs);
        if let Some(ctx) = repair {
            instruction.push_str(&prompts::repair_addendum(ctx));
        }
        instruction
    }

    /// Generate, validate and publish one unit.
    pub async fn synthesize(
        &self,
        task_summary: &str,
        repair: Option<&RepairContext>,
    ) -> Result<SelectedUnit, SynthesisError> {
        let raw = self
            .llm
            .complete(&[], &self.instruction(task_summary, repair))
            .await?;
        let unit: SynthesizedUnit = parse_structured(&raw, "code generation")?;

        let function_name = unit.function_name.trim();
        if function_name.is_empty() {
            return Err(SynthesisError::Incomplete("function_name is empty".into()));
        }
        if unit.code.trim().is_empty() {
            return Err(SynthesisError::Incomplete("code is empty".into()));
        }

        match self.runner.check_syntax(&unit.code).await {
            Ok(()) => {}
            Err(e) => {
                let reason = match e {
                    RunnerError::Syntax(msg) => msg,
                    other => other.to_string(),
                };
                return Err(SynthesisError::Syntax {
                    reason,
                    code: unit.code,
                });
            }
        }

        if !self.runner.has_entry_point(&unit.code, ENTRY_POINT) {
            warn!(function = %function_name, "Generated code has no entry point");
            return Err(SynthesisError::MissingEntryPoint {
                entry: ENTRY_POINT.into(),
                code: unit.code,
            });
        }

        let entry = self
            .library
            .save(function_name, &unit.code, &unit.args_doc)
            .await?;

        info!(unit = %entry.stem, args = unit.current_inputs.len(), "Synthesized unit");
        self.events.publish(DomainEvent::UnitPersisted {
            unit: entry.stem.clone(),
            timestamp: Utc::now(),
        });

        Ok(SelectedUnit {
            stem: entry.stem,
            function_name: entry.function_name,
            args: unit.current_inputs,
        })
    }
}
