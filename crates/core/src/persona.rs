//! Persona: the assistant's voice and what it knows about its user.
//!
//! The background story is resolved in layers (first hit wins):
//!
//! 1. **Config override**: `persona.background_story` in `config.toml`
//! 2. **Story file**: `~/.tasksmith/STORY.md`
//! 3. **Built-in default**
//!
//! The story becomes the system context of every conversational LLM call.
//! The user preamble (user name + OS account) is prepended to every
//! instruction template so generated code can address the right home
//! directory and the replies can address the user by name.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Well-known story file name.
pub const STORY_FILE: &str = "STORY.md";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// The assistant's name
    pub name: String,

    /// How the user wants to be addressed
    pub user_name: String,

    /// The OS account the assistant runs under
    pub os_user: String,

    /// System context for LLM calls
    pub background_story: String,

    /// Where the story came from (for diagnostics)
    pub story_source: String,
}

impl Persona {
    /// The built-in persona.
    pub fn default_persona() -> Self {
        let os_user = os_user();
        Self {
            name: "Tasksmith".into(),
            user_name: os_user.clone(),
            os_user,
            background_story: Self::fallback_story(),
            story_source: "<built-in>".into(),
        }
    }

    fn fallback_story() -> String {
        concat!(
            "You are Tasksmith, a cheerful and attentive desktop assistant. ",
            "You chat with your user and carry out tasks on their computer by ",
            "writing small, reliable programs. You are concise, warm, and honest ",
            "about what you could and could not do.",
        )
        .into()
    }

    /// Resolve the persona from config values and an optional story file.
    pub fn load(
        user_name: Option<&str>,
        story_override: Option<&str>,
        story_file: Option<&Path>,
    ) -> Self {
        let mut persona = Self::default_persona();

        if let Some(name) = user_name.map(str::trim).filter(|n| !n.is_empty()) {
            persona.user_name = name.to_string();
        }

        if let Some(story) = story_override.map(str::trim).filter(|s| !s.is_empty()) {
            debug!("Using background story from config");
            persona.background_story = story.to_string();
            persona.story_source = "<config>".into();
            return persona;
        }

        if let Some(path) = story_file {
            match std::fs::read_to_string(path) {
                Ok(content) if !content.trim().is_empty() => {
                    debug!(path = %path.display(), "Loaded background story");
                    persona.background_story = content.trim().to_string();
                    persona.story_source = path.display().to_string();
                }
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to read story file"),
            }
        }

        persona
    }

    /// System context for LLM calls.
    pub fn system_prompt(&self) -> &str {
        &self.background_story
    }

    /// One line prepended to every instruction template.
    pub fn user_preamble(&self) -> String {
        format!(
            "The user's name is {}. The computer account name is {}.\n",
            self.user_name, self.os_user
        )
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::default_persona()
    }
}

/// The OS account name, or "user" when the environment does not say.
fn os_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "user".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_persona_has_story() {
        let p = Persona::default_persona();
        assert!(p.system_prompt().contains("Tasksmith"));
        assert_eq!(p.story_source, "<built-in>");
    }

    #[test]
    fn config_override_wins() {
        let p = Persona::load(Some("Ryu"), Some("You are a maid."), None);
        assert_eq!(p.system_prompt(), "You are a maid.");
        assert_eq!(p.user_name, "Ryu");
        assert!(p.user_preamble().contains("Ryu"));
    }

    #[test]
    fn story_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORY_FILE);
        std::fs::write(&path, "  A story from disk.  \n").unwrap();

        let p = Persona::load(None, None, Some(&path));
        assert_eq!(p.system_prompt(), "A story from disk.");
        assert_eq!(p.story_source, path.display().to_string());
    }

    #[test]
    fn missing_story_file_falls_back() {
        let p = Persona::load(None, Some("   "), Some(Path::new("/nonexistent/STORY.md")));
        assert_eq!(p.story_source, "<built-in>");
    }

    #[test]
    fn blank_user_name_keeps_os_user() {
        let p = Persona::load(Some("  "), None, None);
        assert_eq!(p.user_name, p.os_user);
    }
}
