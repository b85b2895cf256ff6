//! The bounded execute → analyse → regenerate loop.
//!
//! ```text
//!   Attempt(1) ──ok──▶ Success
//!       │ fail (k < max): discard, analyse, resynthesize
//!       ▼
//!   Attempt(k+1) ... Attempt(max) ──fail──▶ Exhausted
//! ```
//!
//! A resynthesis that fails validation does not end the loop early: the
//! next attempt re-runs the original selection instead.

use chrono::Utc;
use std::sync::Arc;
use tasksmith_core::error::LibraryError;
use tasksmith_core::event::{DomainEvent, EventBus, Stage};
use tasksmith_library::LibraryStore;
use tracing::{debug, info, warn};

use crate::executor::{ExecutionOutcome, Executor};
use crate::llm::LlmClient;
use crate::prompts;
use crate::synthesizer::{SelectedUnit, Synthesizer, UnitSelection};
use crate::ENTRY_POINT;

/// What the generation prompt learns from a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairContext {
    /// The attempt the regenerated unit will run as
    pub attempt: u32,
    pub previous_error: String,
    pub analysis: String,
}

impl RepairContext {
    /// Build a context whose error and analysis together fit in `budget`
    /// characters. The error gets at most half; the analysis gets the rest.
    pub fn new(attempt: u32, previous_error: &str, analysis: &str, budget: usize) -> Self {
        let previous_error = truncate_chars(previous_error, budget / 2);
        let remaining = budget.saturating_sub(previous_error.chars().count());
        Self {
            attempt,
            analysis: truncate_chars(analysis, remaining),
            previous_error,
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Terminal state of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Success { attempt: u32 },
    Exhausted { attempts: u32 },
}

impl LoopState {
    pub fn is_success(&self) -> bool {
        matches!(self, LoopState::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopReport {
    pub state: LoopState,
    /// Unit output on success, the failure summary otherwise
    pub output: String,
    /// Function name of the last unit that ran
    pub final_unit: Option<String>,
    pub attempts: u32,
    /// Stems removed from the library after failing
    pub discarded: Vec<String>,
    /// Stems written to the library during repair
    pub persisted: Vec<String>,
}

pub struct RepairLoop {
    llm: Arc<LlmClient>,
    library: Arc<LibraryStore>,
    executor: Executor,
    synthesizer: Synthesizer,
    events: Arc<EventBus>,
    max_attempts: u32,
    max_context_chars: usize,
}

impl RepairLoop {
    pub fn new(
        llm: Arc<LlmClient>,
        library: Arc<LibraryStore>,
        executor: Executor,
        synthesizer: Synthesizer,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            llm,
            library,
            executor,
            synthesizer,
            events,
            max_attempts: 3,
            max_context_chars: 4000,
        }
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max.max(1);
        self
    }

    pub fn with_max_context_chars(mut self, chars: usize) -> Self {
        self.max_context_chars = chars;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn run(&self, task_summary: &str, initial: UnitSelection) -> LoopReport {
        let max = self.max_attempts;
        let mut current = initial.clone();
        let mut last_error = String::new();
        let mut final_unit = None;
        let mut discarded = Vec::new();
        let mut persisted = Vec::new();

        for attempt in 1..=max {
            let (source, error) = match &current {
                UnitSelection::Ready(unit) => {
                    final_unit = Some(unit.function_name.clone());
                    match self.attempt(unit, attempt).await {
                        Ok(output) => {
                            info!(unit = %unit.stem, attempt, "Task succeeded");
                            return LoopReport {
                                state: LoopState::Success { attempt },
                                output,
                                final_unit,
                                attempts: attempt,
                                discarded,
                                persisted,
                            };
                        }
                        Err((source, error)) => (source, error),
                    }
                }
                UnitSelection::Unavailable {
                    error,
                    rejected_code,
                } => {
                    debug!(attempt, "No unit available for this attempt");
                    (rejected_code.clone(), error.clone())
                }
            };

            let unit_label = match &current {
                UnitSelection::Ready(unit) => unit.stem.clone(),
                UnitSelection::Unavailable { .. } => String::new(),
            };
            warn!(unit = %unit_label, attempt, error = %error, "Attempt failed");
            self.events.publish(DomainEvent::AttemptFailed {
                unit: unit_label,
                attempt,
                error: error.clone(),
                timestamp: Utc::now(),
            });
            last_error = error;

            if attempt == max {
                break;
            }

            self.events.progress(
                Stage::Repairing,
                format!("Attempt {attempt} failed, trying to fix the code"),
            );

            if let UnitSelection::Ready(unit) = &current {
                if self.discard(&unit.stem).await {
                    discarded.push(unit.stem.clone());
                }
            }

            let analysis = self.analyse(&last_error, &source).await;
            let ctx = RepairContext::new(attempt + 1, &last_error, &analysis, self.max_context_chars);

            current = match self.synthesizer.synthesize(task_summary, Some(&ctx)).await {
                Ok(unit) => {
                    persisted.push(unit.stem.clone());
                    UnitSelection::Ready(unit)
                }
                Err(e) => {
                    warn!(error = %e, "Repair synthesis failed, retrying the original unit");
                    match &initial {
                        UnitSelection::Ready(original) => UnitSelection::Ready(original.clone()),
                        UnitSelection::Unavailable { .. } => UnitSelection::unavailable(&e),
                    }
                }
            };
        }

        LoopReport {
            state: LoopState::Exhausted { attempts: max },
            output: exhausted_summary(max, &last_error),
            final_unit,
            attempts: max,
            discarded,
            persisted,
        }
    }

    /// Run one unit. On failure, returns the source it ran alongside the error.
    async fn attempt(&self, unit: &SelectedUnit, attempt: u32) -> Result<String, (String, String)> {
        self.events.publish(DomainEvent::AttemptStarted {
            unit: unit.stem.clone(),
            attempt,
            max_attempts: self.max_attempts,
            timestamp: Utc::now(),
        });
        self.events.progress(
            Stage::Executing,
            format!("Running {} (attempt {attempt}/{})", unit.function_name, self.max_attempts),
        );

        let source = self.library.read_source(&unit.stem).await.unwrap_or_default();

        let path = match self.library.source_path(&unit.stem) {
            Ok(path) => path,
            Err(e) => return Err((source, e.to_string())),
        };

        match self.executor.execute(&path, ENTRY_POINT, &unit.args).await {
            ExecutionOutcome::Success(output) => Ok(output),
            ExecutionOutcome::Failure(error) => Err((source, error)),
        }
    }

    /// Remove a failed unit. Returns whether anything was removed.
    async fn discard(&self, stem: &str) -> bool {
        match self.library.remove(stem).await {
            Ok(_) => {
                self.events.publish(DomainEvent::UnitDiscarded {
                    unit: stem.to_string(),
                    timestamp: Utc::now(),
                });
                true
            }
            Err(LibraryError::NotFound(_)) => {
                debug!(unit = %stem, "Failed unit already gone");
                false
            }
            Err(e) => {
                warn!(unit = %stem, error = %e, "Failed to discard unit");
                false
            }
        }
    }

    async fn analyse(&self, error: &str, source: &str) -> String {
        match self.llm.complete(&[], &prompts::error_analysis(error, source)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Error analysis failed");
                format!("error analysis failed: {e}")
            }
        }
    }
}

pub fn exhausted_summary(attempts: u32, last_error: &str) -> String {
    format!(
        "Code execution failed after {attempts} attempts.\nLast error: {last_error}\n\nSuggestion: check that the request is clearly described, or try rephrasing it."
    )
}
