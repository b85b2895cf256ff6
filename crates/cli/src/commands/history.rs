//! `tasksmith history`: Conversation history commands.

use tasksmith_config::AppConfig;
use tasksmith_core::history::{ConversationRecord, HistoryStore};
use tasksmith_history::FileHistory;

fn open_history() -> Result<FileHistory, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    Ok(FileHistory::open(config.history_path(), config.history.max_records))
}

pub async fn show(count: usize) -> Result<(), Box<dyn std::error::Error>> {
    let history = open_history()?;
    let records = history.recent(count).await;

    println!("🕘 Recent History ({})", history.path().display());
    println!("==================");

    if records.is_empty() {
        println!("   No records yet.");
        return Ok(());
    }

    for record in &records {
        print_record(record);
    }

    Ok(())
}

fn print_record(record: &ConversationRecord) {
    println!(
        "\n  [{}] {}",
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        record.kind
    );
    println!("    You:       {}", record.user_input.replace('\n', " / "));
    println!("    Assistant: {}", record.assistant_response);
    if let Some(task) = record.metadata.get("task_summary").and_then(|v| v.as_str()) {
        println!("    Task:      {task}");
    }
    if let Some(unit) = record.metadata.get("function_name").and_then(|v| v.as_str()) {
        println!("    Function:  {unit}");
    }
}

pub async fn clear() -> Result<(), Box<dyn std::error::Error>> {
    let history = open_history()?;
    history.clear().await?;
    println!("✅ History cleared.");
    Ok(())
}

pub async fn summary() -> Result<(), Box<dyn std::error::Error>> {
    let history = open_history()?;
    println!("📊 {}", history.summary().await);
    println!("   Retaining at most {} records.", history.max_records());
    Ok(())
}
