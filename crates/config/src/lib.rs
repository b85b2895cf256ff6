//! Configuration loading, validation, and management for Tasksmith.
//!
//! Loads configuration from `~/.tasksmith/config.toml` (the directory can be
//! moved with `TASKSMITH_HOME`) with environment variable overrides.
//! Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tasksmith_core::persona::{Persona, STORY_FILE};

/// The root configuration structure.
///
/// Maps directly to `~/.tasksmith/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Who the assistant is and who it talks to
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Conversation history settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// Function library settings
    #[serde(default)]
    pub library: LibraryConfig,

    /// Retry/repair settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Code execution settings
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("persona", &self.persona)
            .field("history", &self.history)
            .field("library", &self.library)
            .field("engine", &self.engine)
            .field("runner", &self.runner)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// How the assistant addresses the user (defaults to the OS account)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// Replaces the built-in background story
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_story: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// History file; relative paths resolve against the config directory
    #[serde(default = "default_history_path")]
    pub path: PathBuf,

    /// Records retained (oldest evicted first)
    #[serde(default = "default_max_records")]
    pub max_records: usize,

    /// Recent records replayed to the LLM as context
    #[serde(default = "default_context_records")]
    pub context_records: usize,
}

fn default_history_path() -> PathBuf {
    PathBuf::from("history.json")
}
fn default_max_records() -> usize {
    10
}
fn default_context_records() -> usize {
    10
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
            max_records: default_max_records(),
            context_records: default_context_records(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Library directory; relative paths resolve against the config directory
    #[serde(default = "default_library_dir")]
    pub dir: PathBuf,
}

fn default_library_dir() -> PathBuf {
    PathBuf::from("library")
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            dir: default_library_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Execution attempts per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Cap on error + analysis text embedded in a repair prompt
    #[serde(default = "default_max_repair_context_chars")]
    pub max_repair_context_chars: usize,
}

fn default_max_retries() -> u32 {
    3
}
fn default_max_repair_context_chars() -> usize {
    4000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            max_repair_context_chars: default_max_repair_context_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Interpreter used to check and run generated units
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Wall-clock limit for one invocation
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_interpreter() -> String {
    "python3".into()
}
fn default_timeout_secs() -> u64 {
    20
}

impl RunnerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.tasksmith/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `TASKSMITH_API_KEY` (highest priority)
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        // Environment variable overrides (highest priority)
        if config.api_key.is_none() {
            config.api_key = std::env::var("TASKSMITH_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("TASKSMITH_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("TASKSMITH_MODEL") {
            config.default_model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        match std::env::var("TASKSMITH_HOME") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => dirs_home().join(".tasksmith"),
        }
    }

    /// Resolve a configured path against the config directory.
    fn resolve(path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Self::config_dir().join(path)
        }
    }

    /// Absolute path of the history file.
    pub fn history_path(&self) -> PathBuf {
        Self::resolve(&self.history.path)
    }

    /// Absolute path of the library directory.
    pub fn library_dir(&self) -> PathBuf {
        Self::resolve(&self.library.dir)
    }

    /// Build the persona from `[persona]` and an optional `STORY.md`.
    pub fn persona(&self) -> Persona {
        let story_file = Self::config_dir().join(STORY_FILE);
        Persona::load(
            self.persona.user_name.as_deref(),
            self.persona.background_story.as_deref(),
            Some(&story_file),
        )
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.history.max_records == 0 {
            return Err(ConfigError::ValidationError(
                "history.max_records must be at least 1".into(),
            ));
        }

        if self.engine.max_retries == 0 {
            return Err(ConfigError::ValidationError(
                "engine.max_retries must be at least 1".into(),
            ));
        }

        if self.runner.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "runner.timeout_secs must be at least 1".into(),
            ));
        }

        if self.runner.interpreter.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "runner.interpreter must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            persona: PersonaConfig::default(),
            history: HistoryConfig::default(),
            library: LibraryConfig::default(),
            engine: EngineConfig::default(),
            runner: RunnerConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.engine.max_retries, 3);
        assert_eq!(config.history.max_records, 10);
        assert_eq!(config.runner.timeout_secs, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.runner.interpreter, config.runner.interpreter);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_retries_rejected() {
        let mut config = AppConfig::default();
        config.engine.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_history_bound_rejected() {
        let mut config = AppConfig::default();
        config.history.max_records = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.default_provider, "openai");
    }

    #[test]
    fn load_from_file_with_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_model = "deepseek-chat"
default_provider = "deepseek"

[persona]
user_name = "Ryunosuke"

[engine]
max_retries = 5

[runner]
interpreter = "python"
timeout_secs = 5

[providers.deepseek]
api_key = "sk-test"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_model, "deepseek-chat");
        assert_eq!(config.persona.user_name.as_deref(), Some("Ryunosuke"));
        assert_eq!(config.engine.max_retries, 5);
        assert_eq!(config.runner.timeout(), Duration::from_secs(5));
        assert!(config.has_api_key());
        // Unspecified sections keep their defaults
        assert_eq!(config.history.max_records, 10);
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_temperature = \"hot\"").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let mut config = AppConfig::default();
        config.library.dir = PathBuf::from("/srv/units");
        assert_eq!(config.library_dir(), PathBuf::from("/srv/units"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("openai"));
        assert!(toml_str.contains("python3"));
    }
}
