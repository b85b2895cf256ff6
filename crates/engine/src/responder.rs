//! Final natural-language summary of a finished task.

use tracing::warn;

use crate::llm::LlmClient;
use crate::prompts;
use crate::schema::{parse_structured, FinalReply};

/// Substituted when the summary call fails or returns nothing usable.
pub const GENERIC_ACKNOWLEDGMENT: &str = "Task complete.";

/// Runs for both success and exhaustion; never fails.
pub async fn final_reply(llm: &LlmClient, task_summary: &str, output: &str) -> String {
    let raw = match llm.complete(&[], &prompts::final_response(task_summary, output)).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Final response call failed");
            return GENERIC_ACKNOWLEDGMENT.to_string();
        }
    };

    match parse_structured::<FinalReply>(&raw, "final response") {
        Ok(FinalReply {
            maid_response: Some(text),
        }) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => GENERIC_ACKNOWLEDGMENT.to_string(),
        Err(e) => {
            warn!(error = %e, "Final response unparseable");
            GENERIC_ACKNOWLEDGMENT.to_string()
        }
    }
}
