//! `tasksmith onboard`: First-time setup.

use tasksmith_config::AppConfig;
use tasksmith_core::persona::STORY_FILE;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Tasksmith — First-Time Setup");
    println!("============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    // Create config file
    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let library_dir = config.library_dir();
    if !library_dir.exists() {
        std::fs::create_dir_all(&library_dir)?;
        println!("✅ Created library directory: {}", library_dir.display());
    }

    let story_path = config_dir.join(STORY_FILE);
    if !story_path.exists() {
        std::fs::write(
            &story_path,
            concat!(
                "You are Tasksmith, a cheerful and attentive desktop assistant.\n",
                "You chat with your user and carry out tasks on their computer by\n",
                "writing small, reliable programs.\n",
            ),
        )?;
        println!("✅ Created {STORY_FILE} (edit it to change the assistant's voice)");
    }

    println!("\n📝 Next steps:");
    println!("   1. Edit {} and add your API key", config_path.display());
    println!("   2. Run: tasksmith chat");
    println!("\n🎉 Setup complete!\n");

    Ok(())
}
