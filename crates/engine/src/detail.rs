//! Detail extraction for automation requests.

use tasksmith_core::message::Message;
use tracing::debug;

use crate::llm::LlmClient;
use crate::prompts;
use crate::schema::{parse_structured, SchemaError, TaskDetail};

/// Either a task ready to run or a question for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    Ready { task_summary: String },
    NeedsClarification { prompt: String },
}

pub async fn extract_detail(
    llm: &LlmClient,
    history: &[Message],
    input: &str,
) -> Result<DetailOutcome, SchemaError> {
    let raw = llm.complete(history, &prompts::detail(input)).await?;
    let detail: TaskDetail = parse_structured(&raw, "detail")?;

    if let Some(prompt) = detail.clarification() {
        debug!(prompt, "Task needs more detail");
        return Ok(DetailOutcome::NeedsClarification {
            prompt: prompt.to_string(),
        });
    }

    match detail.task_summary.as_deref().map(str::trim) {
        Some(summary) if !summary.is_empty() => Ok(DetailOutcome::Ready {
            task_summary: summary.to_string(),
        }),
        _ => Err(SchemaError::Invalid {
            shape: "detail",
            reason: "missing task_summary".into(),
        }),
    }
}
