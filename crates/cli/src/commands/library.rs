//! `tasksmith library`: Function library management commands.

use tasksmith_config::AppConfig;
use tasksmith_core::error::LibraryError;
use tasksmith_core::runner::CodeRunner;
use tasksmith_library::LibraryStore;
use tasksmith_runner::PythonRunner;

fn open_library() -> Result<LibraryStore, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let runner = PythonRunner::new(config.runner.interpreter.clone(), config.runner.timeout());
    Ok(LibraryStore::new(config.library_dir(), runner.extension()))
}

pub async fn list() -> Result<(), Box<dyn std::error::Error>> {
    let library = open_library()?;
    let entries = library.entries().await;

    println!("📚 Function Library ({})", library.dir().display());
    println!("====================");

    if entries.is_empty() {
        println!("   No functions saved yet.");
        return Ok(());
    }

    for entry in &entries {
        println!("  • {} ({}.{})", entry.function_name, entry.stem, library.extension());
        for (i, doc) in entry.args_doc.iter().enumerate() {
            println!("      {}. {doc}", i + 1);
        }
    }
    println!("\n  {} function(s)", entries.len());

    Ok(())
}

pub async fn show(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let library = open_library()?;
    let entry = library
        .get(name)
        .await
        .ok_or_else(|| format!("No library entry named '{name}'"))?;

    println!("📄 {} ({}.{})", entry.function_name, entry.stem, library.extension());
    if !entry.args_doc.is_empty() {
        println!("\n  Parameters:");
        for (i, doc) in entry.args_doc.iter().enumerate() {
            println!("    {}. {doc}", i + 1);
        }
    }
    println!("\n{}", entry.source);

    Ok(())
}

pub async fn remove(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let library = open_library()?;
    match library.remove(name).await {
        Ok(outcome) => {
            if outcome.source_removed && outcome.metadata_removed {
                println!("🗑️  Removed '{name}'.");
            } else {
                println!("🗑️  Removed what remained of '{name}' (entry was incomplete).");
            }
            Ok(())
        }
        Err(LibraryError::NotFound(_)) => Err(format!("No library entry named '{name}'").into()),
        Err(e) => Err(e.into()),
    }
}
