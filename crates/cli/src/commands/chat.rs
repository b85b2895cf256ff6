//! `tasksmith chat`: Interactive or single-message mode.

use std::io::Write;
use std::sync::Arc;
use tasksmith_config::AppConfig;
use tasksmith_core::event::{DomainEvent, EventBus};
use tasksmith_core::session::Session;
use tasksmith_engine::{Engine, LoopState, Reply, ReplyKind};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for API key early: give a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    TASKSMITH_API_KEY = 'sk-...'   (generic)");
        eprintln!("    OPENAI_API_KEY    = 'sk-...'   (for OpenAI direct)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = tasksmith_providers::build_from_config(&config);
    let provider = router.default().ok_or("No default provider configured")?;

    let events = Arc::new(EventBus::default());
    let engine = Engine::from_config(&config, provider, events.clone());
    let progress = spawn_progress_printer(&events);
    let mut session = Session::new();
    debug!(session = %session.id, "Chat session started");

    if let Some(msg) = message {
        // Single message mode
        let reply = engine.handle(&mut session, &msg).await;
        print_reply(&reply);
    } else {
        let persona = config.persona();
        println!();
        println!("  ╔══════════════════════════════════════════════╗");
        println!("  ║       Tasksmith — Interactive Mode           ║");
        println!("  ╚══════════════════════════════════════════════╝");
        println!();
        println!("  Provider:  {}", config.default_provider);
        println!("  Model:     {}", config.default_model);
        println!("  Library:   {}", config.library_dir().display());
        println!("  Persona:   {} (story from {})", persona.name, persona.story_source);
        println!();
        println!("  Type your message and press Enter.");
        println!("  Special commands: 'history', 'clear_history', 'quit'.");
        println!();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("  You > ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            match input {
                "quit" | "exit" => break,
                "history" => {
                    println!("  {}", engine.history().summary().await);
                    println!();
                }
                "clear_history" => {
                    match engine.history().clear().await {
                        Ok(()) => println!("  History cleared."),
                        Err(e) => eprintln!("  [Error] {e}"),
                    }
                    println!();
                }
                _ => {
                    let reply = engine.handle(&mut session, input).await;
                    println!();
                    print_reply(&reply);
                    println!();
                }
            }
        }

        println!();
        println!("  Goodbye!");
        println!();
    }

    progress.abort();
    Ok(())
}

/// Print progress and errors from the engine as they happen.
fn spawn_progress_printer(events: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(line) = describe_event(&event) {
                        eprintln!("  {line}");
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// One status line for events worth showing, `None` for the rest.
fn describe_event(event: &DomainEvent) -> Option<String> {
    match event {
        DomainEvent::Progress { message, .. } => Some(format!("... {message}")),
        DomainEvent::ErrorRaised { context, message, .. } => Some(format!("[Error] {context}: {message}")),
        DomainEvent::AttemptFailed { attempt, error, .. } => {
            let first_line = error.lines().next().unwrap_or_default();
            Some(format!("[Attempt {attempt} failed] {first_line}"))
        }
        DomainEvent::UnitPersisted { unit, .. } => Some(format!("[Saved] {unit}")),
        DomainEvent::UnitDiscarded { unit, .. } => Some(format!("[Discarded] {unit}")),
        DomainEvent::AttemptStarted { .. } | DomainEvent::ClarificationRequested { .. } => None,
    }
}

fn print_reply(reply: &Reply) {
    for line in reply.text.lines() {
        println!("  Assistant > {line}");
    }

    if let ReplyKind::Task(report) = &reply.kind {
        let unit = report.unit_name.as_deref().unwrap_or("(none)");
        match report.state {
            LoopState::Success { attempt } => {
                println!("  [{unit}: succeeded on attempt {attempt}]");
            }
            LoopState::Exhausted { attempts } => {
                println!("  [{unit}: failed after {attempts} attempts]");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tasksmith_core::event::Stage;

    #[test]
    fn progress_events_are_described() {
        let line = describe_event(&DomainEvent::Progress {
            stage: Stage::Coding,
            message: "Writing new code".into(),
            timestamp: Utc::now(),
        });
        assert_eq!(line.as_deref(), Some("... Writing new code"));
    }

    #[test]
    fn attempt_failure_shows_first_line_only() {
        let line = describe_event(&DomainEvent::AttemptFailed {
            unit: "list_files".into(),
            attempt: 2,
            error: "Traceback (most recent call last):\n  File \"x\"".into(),
            timestamp: Utc::now(),
        })
        .unwrap();
        assert_eq!(line, "[Attempt 2 failed] Traceback (most recent call last):");
    }

    #[test]
    fn attempt_start_is_silent() {
        assert!(describe_event(&DomainEvent::AttemptStarted {
            unit: "u".into(),
            attempt: 1,
            max_attempts: 3,
            timestamp: Utc::now(),
        })
        .is_none());
    }
}
