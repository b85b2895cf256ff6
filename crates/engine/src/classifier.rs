//! Intent classification: conversational or automation.

use tasksmith_core::message::Message;
use tracing::debug;

use crate::llm::LlmClient;
use crate::prompts;
use crate::schema::{parse_structured, Intent, IntentVerdict, SchemaError};

/// One LLM call, no retry. Any failure is terminal for the turn.
pub async fn classify(llm: &LlmClient, history: &[Message], input: &str) -> Result<Intent, SchemaError> {
    let raw = llm.complete(history, &prompts::judgement(input)).await?;
    let intent = parse_structured::<IntentVerdict>(&raw, "intent")?.intent()?;
    debug!(?intent, "Classified input");
    Ok(intent)
}
