//! Response schemas for every structured LLM exchange.
//!
//! Each call site parses the reply into one of these shapes. Anything that
//! does not fit is a [`SchemaError`]; call sites decide whether that means a
//! safe default or a "could not understand" reply.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tasksmith_core::error::ProviderError;
use thiserror::Error;

/// A structured LLM exchange that went wrong.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] ProviderError),

    #[error("unparseable {shape} response: {reason}")]
    Parse { shape: &'static str, reason: String },

    #[error("invalid {shape} response: {reason}")]
    Invalid { shape: &'static str, reason: String },
}

/// Parse `raw` as `T`. When the whole text is not valid JSON, retry on the
/// span between the first `{` and the last `}`.
pub fn parse_structured<T: DeserializeOwned>(raw: &str, shape: &'static str) -> Result<T, SchemaError> {
    let text = crate::llm::strip_code_fences(raw);
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(first) => {
            let span = match (text.find('{'), text.rfind('}')) {
                (Some(start), Some(end)) if start < end => &text[start..=end],
                _ => {
                    return Err(SchemaError::Parse {
                        shape,
                        reason: first.to_string(),
                    });
                }
            };
            serde_json::from_str(span).map_err(|e| SchemaError::Parse {
                shape,
                reason: e.to_string(),
            })
        }
    }
}

/// What the user wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Conversational,
    Automation,
}

/// `{"a": "chat" | "code"}`
#[derive(Debug, Deserialize)]
pub struct IntentVerdict {
    pub a: String,
}

impl IntentVerdict {
    pub fn intent(&self) -> Result<Intent, SchemaError> {
        match self.a.trim().to_ascii_lowercase().as_str() {
            "chat" => Ok(Intent::Conversational),
            "code" => Ok(Intent::Automation),
            other => Err(SchemaError::Invalid {
                shape: "intent",
                reason: format!("unknown category '{other}'"),
            }),
        }
    }
}

/// `{"reply": .., "tone": ..}`
#[derive(Debug, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    #[serde(default)]
    pub tone: Option<String>,
}

/// `{"task_summary": .., "need_additional_data": .. | null}`
#[derive(Debug, Deserialize)]
pub struct TaskDetail {
    #[serde(default)]
    pub task_summary: Option<String>,
    #[serde(default)]
    pub need_additional_data: Option<String>,
}

impl TaskDetail {
    /// The clarification request, if any. JSON null, the literal text
    /// "null", and blank text all mean "no clarification needed".
    pub fn clarification(&self) -> Option<&str> {
        self.need_additional_data
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
    }
}

/// `{"matched": .., "matched_function": .., "args_value_list": [..]}`
#[derive(Debug, Deserialize)]
pub struct MatchVerdict {
    #[serde(default)]
    pub matched: bool,
    #[serde(default)]
    pub matched_function: Option<String>,
    #[serde(default)]
    pub args_value_list: Vec<serde_json::Value>,
}

/// `{"function_name": .., "code": .., "args_doc": [..], "current_inputs": [..]}`
#[derive(Debug, Deserialize)]
pub struct SynthesizedUnit {
    #[serde(default)]
    pub function_name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub args_doc: Vec<String>,
    #[serde(default)]
    pub current_inputs: Vec<serde_json::Value>,
}

/// `{"maid_response": ..}`
#[derive(Debug, Deserialize)]
pub struct FinalReply {
    #[serde(default)]
    pub maid_response: Option<String>,
}
