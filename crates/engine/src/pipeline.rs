//! The request pipeline: one user message in, one reply out.

use std::sync::Arc;
use tasksmith_config::AppConfig;
use tasksmith_core::event::{DomainEvent, EventBus, Stage};
use tasksmith_core::history::{ConversationRecord, HistoryStore, RecordKind};
use tasksmith_core::provider::Provider;
use tasksmith_core::runner::CodeRunner;
use tasksmith_core::session::Session;
use tasksmith_history::FileHistory;
use tasksmith_library::LibraryStore;
use tasksmith_runner::PythonRunner;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::chat::{small_talk, DEFAULT_TONE};
use crate::classifier::classify;
use crate::detail::{extract_detail, DetailOutcome};
use crate::executor::Executor;
use crate::llm::LlmClient;
use crate::matcher::{MatchOutcome, Matcher};
use crate::repair::{LoopState, RepairLoop};
use crate::responder::final_reply;
use crate::schema::Intent;
use crate::synthesizer::{Synthesizer, UnitSelection};

/// Reply used when the LLM's answer could not be interpreted.
pub const NOT_UNDERSTOOD: &str = "Sorry, I could not understand that response.";

/// Tunables for one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub max_retries: u32,
    pub max_repair_context_chars: usize,
    /// History records replayed to classification, chat and detail calls
    pub context_records: usize,
    /// Execution budget stated to code generation
    pub time_budget_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_repair_context_chars: 4000,
            context_records: 10,
            time_budget_secs: 20,
        }
    }
}

/// Outcome of an automation request.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub task_summary: String,
    /// Function name of the unit that ran last
    pub unit_name: Option<String>,
    pub raw_output: String,
    pub state: LoopState,
    pub attempts: u32,
    pub discarded: Vec<String>,
    pub persisted: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyKind {
    Chat,
    Clarification,
    Task(TaskReport),
    Failure,
}

/// What the assistant says back, with a tone hint for voice output.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub tone: String,
    pub kind: ReplyKind,
}

impl Reply {
    fn failure() -> Self {
        Self {
            text: NOT_UNDERSTOOD.into(),
            tone: DEFAULT_TONE.into(),
            kind: ReplyKind::Failure,
        }
    }
}

pub struct Engine {
    llm: Arc<LlmClient>,
    history: Arc<dyn HistoryStore>,
    library: Arc<LibraryStore>,
    runner: Arc<dyn CodeRunner>,
    events: Arc<EventBus>,
    settings: EngineSettings,
    in_flight: Mutex<()>,
}

impl Engine {
    pub fn new(
        llm: LlmClient,
        history: Arc<dyn HistoryStore>,
        library: Arc<LibraryStore>,
        runner: Arc<dyn CodeRunner>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            llm: Arc::new(llm),
            history,
            library,
            runner,
            events,
            settings: EngineSettings::default(),
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Wire an engine from configuration: file history, the library
    /// directory, and a Python runner.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>, events: Arc<EventBus>) -> Self {
        let runner = Arc::new(PythonRunner::new(
            config.runner.interpreter.clone(),
            config.runner.timeout(),
        ));
        let library = Arc::new(LibraryStore::new(config.library_dir(), runner.extension()));
        let history = Arc::new(FileHistory::open(config.history_path(), config.history.max_records));
        let llm = LlmClient::new(provider, config.default_model.clone(), config.persona())
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens);

        Self::new(llm, history, library, runner, events).with_settings(EngineSettings {
            max_retries: config.engine.max_retries,
            max_repair_context_chars: config.engine.max_repair_context_chars,
            context_records: config.history.context_records,
            time_budget_secs: config.runner.timeout_secs,
        })
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    pub fn library(&self) -> &Arc<LibraryStore> {
        &self.library
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    fn synthesizer(&self) -> Synthesizer {
        Synthesizer::new(
            self.llm.clone(),
            self.library.clone(),
            self.runner.clone(),
            self.events.clone(),
        )
        .with_time_budget(self.settings.time_budget_secs)
    }

    fn repair_loop(&self) -> RepairLoop {
        RepairLoop::new(
            self.llm.clone(),
            self.library.clone(),
            Executor::new(self.runner.clone()),
            self.synthesizer(),
            self.events.clone(),
        )
        .with_max_attempts(self.settings.max_retries)
        .with_max_context_chars(self.settings.max_repair_context_chars)
    }

    /// Handle one user message. Requests are served one at a time; a
    /// second caller waits for the first to finish.
    pub async fn handle(&self, session: &mut Session, input: &str) -> Reply {
        let _guard = self.in_flight.lock().await;

        let input = session.merge_input(input);
        let context = self.history.as_context(self.settings.context_records).await;

        self.events.progress(Stage::Classifying, "Figuring out what you need");
        let intent = match classify(&self.llm, &context, &input).await {
            Ok(intent) => intent,
            Err(e) => return self.not_understood("classification", &e.to_string()),
        };

        match intent {
            Intent::Conversational => {
                let talk = match small_talk(&self.llm, &context, &input).await {
                    Ok(talk) => talk,
                    Err(e) => return self.not_understood("chat", &e.to_string()),
                };
                self.record(ConversationRecord::new(RecordKind::Chat, &input, &talk.reply))
                    .await;
                Reply {
                    text: talk.reply,
                    tone: talk.tone,
                    kind: ReplyKind::Chat,
                }
            }
            Intent::Automation => {
                let detail = match extract_detail(&self.llm, &context, &input).await {
                    Ok(detail) => detail,
                    Err(e) => return self.not_understood("detail", &e.to_string()),
                };
                match detail {
                    DetailOutcome::NeedsClarification { prompt } => {
                        session.request_clarification(&input, &prompt);
                        self.events.publish(DomainEvent::ClarificationRequested {
                            session_id: session.id.clone(),
                            prompt: prompt.clone(),
                            timestamp: chrono::Utc::now(),
                        });
                        Reply {
                            text: prompt,
                            tone: DEFAULT_TONE.into(),
                            kind: ReplyKind::Clarification,
                        }
                    }
                    DetailOutcome::Ready { task_summary } => self.run_task(&input, task_summary).await,
                }
            }
        }
    }

    async fn run_task(&self, input: &str, task_summary: String) -> Reply {
        info!(task = %task_summary, "Running automation task");

        self.events.progress(Stage::Matching, "Checking the library for a function that fits");
        let matcher = Matcher::new(self.llm.clone(), self.library.clone());
        let mut persisted = Vec::new();

        let selection = match matcher.find(&task_summary).await {
            MatchOutcome::Matched(unit) => UnitSelection::Ready(unit),
            MatchOutcome::NoMatch => {
                self.events.progress(Stage::Coding, "Writing new code for this task");
                match self.synthesizer().synthesize(&task_summary, None).await {
                    Ok(unit) => {
                        persisted.push(unit.stem.clone());
                        UnitSelection::Ready(unit)
                    }
                    Err(e) => {
                        warn!(error = %e, "Initial synthesis failed");
                        UnitSelection::unavailable(&e)
                    }
                }
            }
        };

        let report = self.repair_loop().run(&task_summary, selection).await;
        persisted.extend(report.persisted);

        self.events.progress(Stage::Summarizing, "Putting the answer together");
        let text = final_reply(&self.llm, &task_summary, &report.output).await;

        let function_name = match &report.final_unit {
            Some(name) => serde_json::Value::from(name.as_str()),
            None => serde_json::Value::Null,
        };
        self.record(
            ConversationRecord::new(RecordKind::CodeExecution, input, &text)
                .with_metadata("task_summary", task_summary.as_str())
                .with_metadata("function_name", function_name)
                .with_metadata("code_output", report.output.as_str()),
        )
        .await;

        debug!(state = ?report.state, attempts = report.attempts, "Task finished");
        Reply {
            text,
            tone: DEFAULT_TONE.into(),
            kind: ReplyKind::Task(TaskReport {
                task_summary,
                unit_name: report.final_unit,
                raw_output: report.output,
                state: report.state,
                attempts: report.attempts,
                discarded: report.discarded,
                persisted,
            }),
        }
    }

    fn not_understood(&self, context: &str, reason: &str) -> Reply {
        warn!(context, reason, "Could not interpret LLM response");
        self.events.error(context, reason);
        Reply::failure()
    }

    async fn record(&self, record: ConversationRecord) {
        if let Err(e) = self.history.append(record).await {
            warn!(error = %e, "Failed to save history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{llm_with, ScriptedProvider, ScriptedRunner};
    use tasksmith_history::InMemoryHistory;

    fn engine(dir: &std::path::Path, provider: Arc<ScriptedProvider>) -> Engine {
        Engine::new(
            llm_with(provider),
            Arc::new(InMemoryHistory::new(10)),
            Arc::new(LibraryStore::new(dir.join("library"), "py")),
            Arc::new(ScriptedRunner::new(vec![])),
            Arc::new(EventBus::default()),
        )
    }

    #[tokio::test]
    async fn chat_reply_is_recorded() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![
            r#"{"a":"chat"}"#,
            r#"{"reply":"Hello there!","tone":"Speak warmly."}"#,
        ]));
        let engine = engine(tmp.path(), provider);
        let mut session = Session::new();

        let reply = engine.handle(&mut session, "hi").await;
        assert_eq!(reply.kind, ReplyKind::Chat);
        assert_eq!(reply.text, "Hello there!");
        assert_eq!(reply.tone, "Speak warmly.");

        let records = engine.history().all().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, RecordKind::Chat);
    }

    #[tokio::test]
    async fn unreadable_classification_is_a_failure_reply() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = engine(tmp.path(), Arc::new(ScriptedProvider::new(vec!["hmm?"])));
        let mut rx = engine.events().subscribe();
        let mut session = Session::new();

        let reply = engine.handle(&mut session, "hi").await;
        assert_eq!(reply.kind, ReplyKind::Failure);
        assert_eq!(reply.text, NOT_UNDERSTOOD);
        assert_eq!(engine.history().len().await, 0);

        let mut saw_error = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event.as_ref(), DomainEvent::ErrorRaised { .. }) {
                saw_error = true;
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn history_is_replayed_as_context() {
        let tmp = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![
            r#"{"a":"chat"}"#,
            r#"{"reply":"one","tone":"t"}"#,
            r#"{"a":"chat"}"#,
            r#"{"reply":"two","tone":"t"}"#,
        ]));
        let engine = engine(tmp.path(), provider.clone());
        let mut session = Session::new();

        engine.handle(&mut session, "first").await;
        engine.handle(&mut session, "second").await;

        // system, "first", "one", instruction
        let messages = provider.request(2).messages;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "first");
        assert_eq!(messages[2].content, "one");
    }
}
