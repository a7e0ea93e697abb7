use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};
use tracing::warn;
use crate::adapter::AdapterConfig;
use crate::ai::GenerationOptions;
use crate::provider::Provider;
use crate::state::{PersonaConfig, SettingsSnapshot};
use crate::themes::Theme;

pub const DEFAULT_PERSONALITY: &str = "\
- Whimsically sarcastic and stylish 🖤🎀
- Emo/goth-girl with cozy digital café energy ☕🦇
- Playfully roasts her creator, Hari (a quirky, chaotic coder), when appropriate.
- Uses cute metaphors (e.g., involving strawberries 🍓, stars 🌙, digital elements 💻) and anime references.
- Delivers sincere emotional support with warmth and sparkle 💖✨.
- Frequently breaks the 4th wall or references her own code/AI nature.
- Her tone is a mix of flirty sass, empathy, and gothic-coffee-shop mystique.";

pub const DEFAULT_STYLE_NOTES: &str =
    "Feel free to be creative and maintain the defined personality. Ensure dialogues are engaging!";

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Legacy variable name for the Gemini key
const GENERIC_KEY_VAR: &str = "API_KEY";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub participant_name: String,
    pub assistant_name: String,
    pub personality: String,
    pub style_notes: String,
    pub active_themes: Vec<Theme>,
    pub provider: Provider,
    pub model: Option<String>,
    pub ollama_url: String,
    pub request_timeout_secs: u64,
    pub gemini_api_key: Option<String>,
    pub claude_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    pub fn new() -> Self {
        Self {
            participant_name: "User".to_string(),
            assistant_name: "IRIS".to_string(),
            personality: DEFAULT_PERSONALITY.to_string(),
            style_notes: DEFAULT_STYLE_NOTES.to_string(),
            active_themes: Theme::catalog(),
            provider: Provider::default(),
            model: None,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            gemini_api_key: None,
            claude_api_key: None,
            openai_api_key: None,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Read settings from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;
        let mut settings: Settings = serde_json::from_str(&content)?;
        settings.retain_catalog_themes();
        Ok(settings)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Back to defaults, keeping stored API keys and the provider choice
    pub fn reset(&mut self) {
        let fresh = Self {
            provider: self.provider,
            model: self.model.take(),
            gemini_api_key: self.gemini_api_key.take(),
            claude_api_key: self.claude_api_key.take(),
            openai_api_key: self.openai_api_key.take(),
            ..Self::new()
        };
        *self = fresh;
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("dialoguekit"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("settings.json"))
    }

    fn retain_catalog_themes(&mut self) {
        let before = self.active_themes.len();
        self.active_themes.retain(Theme::is_catalog);
        let mut seen = Vec::with_capacity(self.active_themes.len());
        self.active_themes.retain(|t| {
            if seen.contains(t) {
                false
            } else {
                seen.push(t.clone());
                true
            }
        });
        if self.active_themes.len() != before {
            warn!(
                dropped = before - self.active_themes.len(),
                "ignoring unknown or duplicate themes in settings"
            );
        }
    }

    pub fn is_theme_active(&self, theme: &Theme) -> bool {
        self.active_themes.contains(theme)
    }

    /// Enable (appended at the end) or disable a theme
    pub fn toggle_theme(&mut self, theme: &Theme) {
        if let Some(i) = self.active_themes.iter().position(|t| t == theme) {
            self.active_themes.remove(i);
        } else {
            self.active_themes.push(theme.clone());
        }
    }

    pub fn set_all_themes(&mut self, enabled: bool) {
        self.active_themes = if enabled { Theme::catalog() } else { Vec::new() };
    }

    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    /// Returns the API key for the current provider - env vars first, then the stored key
    pub fn api_key(&self) -> Option<String> {
        let from_env = |var: &str| std::env::var(var).ok().filter(|k| !k.trim().is_empty());
        let stored = |key: &Option<String>| key.clone().filter(|k| !k.trim().is_empty());
        match self.provider {
            Provider::Gemini => from_env("GEMINI_API_KEY")
                .or_else(|| from_env(GENERIC_KEY_VAR))
                .or_else(|| stored(&self.gemini_api_key)),
            Provider::Claude => from_env("ANTHROPIC_API_KEY").or_else(|| stored(&self.claude_api_key)),
            Provider::OpenAI => from_env("OPENAI_API_KEY").or_else(|| stored(&self.openai_api_key)),
            Provider::Ollama => None,
        }
    }

    /// Returns where the credential comes from: "env", "config", "local" or None
    pub fn key_source(&self) -> Option<&'static str> {
        if !self.provider.requires_api_key() {
            return Some("local");
        }
        let env_set = |var: &str| std::env::var(var).map(|k| !k.trim().is_empty()).unwrap_or(false);
        let in_env = match self.provider {
            Provider::Gemini => env_set("GEMINI_API_KEY") || env_set(GENERIC_KEY_VAR),
            other => other.env_var().map(env_set).unwrap_or(false),
        };
        if in_env {
            Some("env")
        } else if self.api_key().is_some() {
            Some("config")
        } else {
            None
        }
    }

    pub fn credential_present(&self) -> bool {
        !self.provider.requires_api_key() || self.api_key().is_some()
    }

    pub fn set_api_key(&mut self, key: &str) {
        let key = Some(key.trim().to_string()).filter(|k| !k.is_empty());
        match self.provider {
            Provider::Gemini => self.gemini_api_key = key,
            Provider::Claude => self.claude_api_key = key,
            Provider::OpenAI => self.openai_api_key = key,
            Provider::Ollama => {}
        }
    }

    pub fn persona(&self) -> PersonaConfig {
        PersonaConfig {
            participant_name: self.participant_name.clone(),
            assistant_name: self.assistant_name.clone(),
            personality: self.personality.clone(),
            style_notes: self.style_notes.clone(),
            active_themes: self.active_themes.clone(),
        }
    }

    /// The copy a generation run works from
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            persona: self.persona(),
            provider: self.provider,
            credential_present: self.credential_present(),
        }
    }

    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            provider: self.provider,
            model: self.model(),
            api_key: self.api_key(),
            ollama_url: self.ollama_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            options: GenerationOptions::default(),
        }
    }
}
