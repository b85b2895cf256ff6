//! `tasksmith status`: Show resolved configuration.

use tasksmith_config::AppConfig;
use tasksmith_runner::PythonRunner;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let persona = config.persona();
    let runner = PythonRunner::new(config.runner.interpreter.clone(), config.runner.timeout());

    println!("Tasksmith Status");
    println!("================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.default_model);
    println!("  Temperature:  {}", config.default_temperature);
    println!("  API key:      {}", if config.has_api_key() { "configured" } else { "missing" });
    println!("  User:         {} (OS account {})", persona.user_name, persona.os_user);
    println!("  Story:        {}", persona.story_source);
    println!("  History:      {} (max {} records)", config.history_path().display(), config.history.max_records);
    println!("  Library:      {}", config.library_dir().display());
    println!("  Attempts:     {}", config.engine.max_retries);
    println!(
        "  Interpreter:  {} ({}, {}s limit)",
        config.runner.interpreter,
        if runner.is_available().await { "found" } else { "not found" },
        config.runner.timeout_secs
    );

    // Check config file existence
    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `tasksmith onboard` first");
    }

    Ok(())
}
