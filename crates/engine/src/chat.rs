//! The conversational branch.

use tasksmith_core::message::Message;

use crate::llm::LlmClient;
use crate::prompts;
use crate::schema::{parse_structured, ChatReply, SchemaError};

/// Tone used whenever the LLM does not provide one.
pub const DEFAULT_TONE: &str = "Speak in a cheerful and positive tone.";

/// Reply text plus a speaking tone for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmallTalk {
    pub reply: String,
    pub tone: String,
}

pub async fn small_talk(llm: &LlmClient, history: &[Message], input: &str) -> Result<SmallTalk, SchemaError> {
    let raw = llm.complete(history, &prompts::small_talk(input)).await?;
    let parsed: ChatReply = parse_structured(&raw, "chat")?;

    let reply = parsed.reply.trim();
    if reply.is_empty() {
        return Err(SchemaError::Invalid {
            shape: "chat",
            reason: "empty reply".into(),
        });
    }

    let tone = parsed
        .tone
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TONE.to_string());

    Ok(SmallTalk {
        reply: reply.to_string(),
        tone,
    })
}
