use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    Ollama,
    Claude,
    OpenAI,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Ollama => "ollama",
            Provider::Claude => "claude",
            Provider::OpenAI => "openai",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Some(Provider::Gemini),
            "ollama" => Some(Provider::Ollama),
            "claude" => Some(Provider::Claude),
            "openai" => Some(Provider::OpenAI),
            _ => None,
        }
    }

    pub fn all() -> Vec<Provider> {
        vec![Provider::Gemini, Provider::Ollama, Provider::Claude, Provider::OpenAI]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini (Google)",
            Provider::Ollama => "Ollama (Local)",
            Provider::Claude => "Claude (Anthropic)",
            Provider::OpenAI => "ChatGPT (OpenAI)",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.5-flash",
            Provider::Ollama => "llama3.2:latest",
            Provider::Claude => "claude-sonnet-4-20250514",
            Provider::OpenAI => "gpt-4o-mini",
        }
    }

    /// Environment variable checked before the stored key
    pub fn env_var(&self) -> Option<&'static str> {
        match self {
            Provider::Gemini => Some("GEMINI_API_KEY"),
            Provider::Ollama => None,
            Provider::Claude => Some("ANTHROPIC_API_KEY"),
            Provider::OpenAI => Some("OPENAI_API_KEY"),
        }
    }

    pub fn requires_api_key(&self) -> bool {
        self.env_var().is_some()
    }

    /// Move to the next provider in `all()` order, wrapping around
    pub fn next(&self) -> Provider {
        let all = Self::all();
        let i = all.iter().position(|p| p == self).unwrap_or(0);
        all[(i + 1) % all.len()]
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_round_trips() {
        for provider in Provider::all() {
            assert_eq!(Provider::from_str(provider.as_str()), Some(provider));
        }
        assert_eq!(Provider::from_str("GEMINI"), Some(Provider::Gemini));
        assert_eq!(Provider::from_str("bard"), None);
    }

    #[test]
    fn test_next_wraps() {
        assert_eq!(Provider::Gemini.next(), Provider::Ollama);
        assert_eq!(Provider::OpenAI.next(), Provider::Gemini);
    }

    #[test]
    fn test_only_ollama_is_keyless() {
        assert!(!Provider::Ollama.requires_api_key());
        assert!(Provider::Gemini.requires_api_key());
    }
}
