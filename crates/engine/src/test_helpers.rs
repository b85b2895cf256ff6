//! Shared test helpers for engine tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tasksmith_core::error::{ProviderError, RunnerError};
use tasksmith_core::message::Message;
use tasksmith_core::persona::Persona;
use tasksmith_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use tasksmith_core::runner::CodeRunner;

use crate::llm::LlmClient;

/// A mock provider that returns a sequence of scripted text responses.
///
/// Each call to `complete` returns the next response in the queue.
/// Panics if more calls are made than responses provided.
pub struct ScriptedProvider {
    responses: Vec<String>,
    fail: bool,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: responses.into_iter().map(String::from).collect(),
            fail: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider whose every call fails with a network error.
    pub fn failing() -> Self {
        Self {
            responses: Vec::new(),
            fail: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The `index`-th request received.
    pub fn request(&self, index: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len();
        requests.push(request);

        if self.fail {
            return Err(ProviderError::Network("connection refused".into()));
        }

        let Some(text) = self.responses.get(index) else {
            panic!(
                "ScriptedProvider: no more responses (call #{}, have {})",
                index,
                self.responses.len()
            );
        };

        Ok(ProviderResponse {
            message: Message::assistant(text.as_str()),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        })
    }
}

/// An LLM client over `provider` with a fixed persona.
pub fn llm_with(provider: Arc<dyn Provider>) -> LlmClient {
    let persona = Persona::load(Some("Tester"), Some("You are a test assistant."), None);
    LlmClient::new(provider, "mock-model", persona)
}

/// A code runner with scripted invocation outcomes.
///
/// Syntax fails for sources containing `SYNTAX_ERROR`; the entry point is
/// any top-level `def <entry>(` line.
pub struct ScriptedRunner {
    outcomes: Mutex<VecDeque<Result<String, RunnerError>>>,
    invocations: Mutex<Vec<(PathBuf, Vec<serde_json::Value>)>>,
}

impl ScriptedRunner {
    pub fn new(outcomes: Vec<Result<String, RunnerError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<(PathBuf, Vec<serde_json::Value>)> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CodeRunner for ScriptedRunner {
    fn name(&self) -> &str {
        "scripted"
    }

    fn extension(&self) -> &str {
        "py"
    }

    async fn check_syntax(&self, source: &str) -> Result<(), RunnerError> {
        if source.trim().is_empty() {
            return Err(RunnerError::EmptySource);
        }
        if source.contains("SYNTAX_ERROR") {
            return Err(RunnerError::Syntax("SyntaxError: invalid syntax (line 1)".into()));
        }
        Ok(())
    }

    fn has_entry_point(&self, source: &str, entry: &str) -> bool {
        tasksmith_runner::defines_top_level_function(source, entry)
    }

    async fn invoke(
        &self,
        path: &Path,
        _entry: &str,
        args: &[serde_json::Value],
    ) -> Result<String, RunnerError> {
        self.invocations
            .lock()
            .unwrap()
            .push((path.to_path_buf(), args.to_vec()));
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedRunner: no more outcomes for {}", path.display()))
    }
}

/// JSON for a synthesized unit with a valid `main`.
pub fn unit_json(function_name: &str, inputs: serde_json::Value) -> String {
    serde_json::json!({
        "function_name": function_name,
        "code": format!("def main(folder):\n    return '{function_name} ran'\n"),
        "args_doc": ["1st: folder path"],
        "current_inputs": inputs,
    })
    .to_string()
}

/// JSON for a synthesized unit that lacks `main`.
pub fn unit_without_entry_json(function_name: &str) -> String {
    serde_json::json!({
        "function_name": function_name,
        "code": "def helper():\n    return 'x'\n",
        "args_doc": [],
        "current_inputs": [],
    })
    .to_string()
}
