//! Execution of persisted units.
//!
//! The executor never returns an error: every failure, including a unit
//! that was tampered with after it was saved, becomes
//! [`ExecutionOutcome::Failure`] carrying text for error analysis.

use std::path::Path;
use std::sync::Arc;
use tasksmith_core::runner::CodeRunner;
use tracing::{debug, warn};

/// Result of one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success(String),
    Failure(String),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success(_))
    }
}

#[derive(Clone)]
pub struct Executor {
    runner: Arc<dyn CodeRunner>,
}

impl Executor {
    pub fn new(runner: Arc<dyn CodeRunner>) -> Self {
        Self { runner }
    }

    /// Re-check the unit on disk, then load and invoke it.
    pub async fn execute(
        &self,
        path: &Path,
        entry: &str,
        args: &[serde_json::Value],
    ) -> ExecutionOutcome {
        if let Err(reason) = self.pre_check(path, entry).await {
            warn!(unit = %path.display(), %reason, "Pre-check failed");
            return ExecutionOutcome::Failure(format!("pre-check failed: {reason}"));
        }

        match self.runner.invoke(path, entry, args).await {
            Ok(output) => {
                debug!(unit = %path.display(), "Unit succeeded");
                ExecutionOutcome::Success(output)
            }
            Err(e) => {
                debug!(unit = %path.display(), error = %e, "Unit failed");
                ExecutionOutcome::Failure(e.to_string())
            }
        }
    }

    async fn pre_check(&self, path: &Path, entry: &str) -> Result<(), String> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;

        if source.trim().is_empty() {
            return Err("source is empty".into());
        }

        self.runner
            .check_syntax(&source)
            .await
            .map_err(|e| e.to_string())?;

        if !self.runner.has_entry_point(&source, entry) {
            return Err(format!("entry point `{entry}` is not defined"));
        }

        Ok(())
    }
}
