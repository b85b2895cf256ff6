//! The LLM boundary as the engine sees it: `complete(system, history, user) -> text`.

use std::sync::Arc;
use tasksmith_core::error::ProviderError;
use tasksmith_core::message::Message;
use tasksmith_core::persona::Persona;
use tasksmith_core::provider::{Provider, ProviderRequest};
use tracing::debug;

/// Wraps a provider with the model settings and persona every call shares.
pub struct LlmClient {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    persona: Persona,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, persona: Persona) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            persona,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `[system, history.., preamble + instruction]` and return the
    /// reply text with any code fences removed.
    pub async fn complete(
        &self,
        history: &[Message],
        instruction: &str,
    ) -> Result<String, ProviderError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.persona.system_prompt()));
        messages.extend_from_slice(history);
        messages.push(Message::user(format!(
            "{}{}",
            self.persona.user_preamble(),
            instruction
        )));

        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stop: vec![],
        };

        debug!(
            provider = %self.provider.name(),
            model = %self.model,
            history = history.len(),
            "LLM call"
        );

        let response = self.provider.complete(request).await?;
        Ok(strip_code_fences(&response.message.content).to_string())
    }
}

/// Remove a surrounding Markdown code fence (```` ```json ```` or
/// ```` ``` ````) and trim.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // Drop the language tag line
        text = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}
