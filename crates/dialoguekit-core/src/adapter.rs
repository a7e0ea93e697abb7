//! LLM client adapter
//!
//! `DialogueSource` is the seam the orchestrator calls through. `LlmAdapter`
//! is the production implementation: it renders the persona instruction,
//! builds the per-theme prompt and makes one non-streaming call on a
//! provider client that is constructed on first use and then reused.

use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::info;
use crate::ai::{ClaudeClient, GeminiClient, GenerationOptions, OllamaClient, OpenAIClient};
use crate::error::{GenerationError, GenerationResult};
use crate::prompt::{build_prompt, render_instruction};
use crate::provider::Provider;
use crate::state::PersonaConfig;
use crate::themes::Theme;

/// Everything one per-theme call needs
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub theme: Theme,
    pub count: usize,
    pub persona: PersonaConfig,
}

/// Produces raw response text for a generation request
#[async_trait]
pub trait DialogueSource: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult<String>;
}

enum ProviderClient {
    Gemini(GeminiClient),
    Ollama(OllamaClient),
    Claude(ClaudeClient),
    OpenAI(OpenAIClient),
}

impl ProviderClient {
    async fn generate(
        &self,
        model: &str,
        instruction: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> GenerationResult<String> {
        match self {
            ProviderClient::Gemini(c) => c.generate(model, instruction, prompt, options).await,
            ProviderClient::Ollama(c) => c.generate(model, instruction, prompt, options).await,
            ProviderClient::Claude(c) => c.generate(model, instruction, prompt, options).await,
            ProviderClient::OpenAI(c) => c.generate(model, instruction, prompt, options).await,
        }
    }
}

/// Connection settings for building an `LlmAdapter`
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    pub provider: Provider,
    pub model: String,
    pub api_key: Option<String>,
    pub ollama_url: String,
    pub timeout: Duration,
    pub options: GenerationOptions,
}

pub struct LlmAdapter {
    config: AdapterConfig,
    client: OnceCell<ProviderClient>,
}

impl LlmAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    pub fn provider(&self) -> Provider {
        self.config.provider
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Whether the single provider client has been built yet
    pub fn is_initialized(&self) -> bool {
        self.client.initialized()
    }

    fn usable_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    async fn client(&self) -> GenerationResult<&ProviderClient> {
        self.client
            .get_or_try_init(|| async {
                let provider = self.config.provider;
                let timeout = self.config.timeout;
                let missing = || GenerationError::MissingCredential { provider };
                info!(provider = provider.as_str(), model = %self.config.model, "initializing LLM client");
                let client = match provider {
                    Provider::Gemini => {
                        ProviderClient::Gemini(GeminiClient::new(self.usable_key().ok_or_else(missing)?, timeout)?)
                    }
                    Provider::Claude => {
                        ProviderClient::Claude(ClaudeClient::new(self.usable_key().ok_or_else(missing)?, timeout)?)
                    }
                    Provider::OpenAI => {
                        ProviderClient::OpenAI(OpenAIClient::new(self.usable_key().ok_or_else(missing)?, timeout)?)
                    }
                    Provider::Ollama => {
                        ProviderClient::Ollama(OllamaClient::new(&self.config.ollama_url, timeout)?)
                    }
                };
                Ok::<_, GenerationError>(client)
            })
            .await
    }
}

#[async_trait]
impl DialogueSource for LlmAdapter {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult<String> {
        if self.config.provider.requires_api_key() && self.usable_key().is_none() {
            return Err(GenerationError::MissingCredential {
                provider: self.config.provider,
            });
        }

        let client = self.client().await?;
        let instruction = render_instruction(&request.persona);
        let prompt = build_prompt(&request.theme, request.count, &request.persona);

        info!(
            theme = %request.theme,
            count = request.count,
            assistant = %request.persona.assistant_name,
            "requesting conversations"
        );
        client
            .generate(&self.config.model, &instruction, &prompt, &self.config.options)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: Provider, api_key: Option<&str>) -> AdapterConfig {
        AdapterConfig {
            provider,
            model: provider.default_model().to_string(),
            api_key: api_key.map(str::to_string),
            ollama_url: "http://localhost:11434".to_string(),
            timeout: Duration::from_secs(5),
            options: GenerationOptions::default(),
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            theme: Theme::new("Fashion Talk"),
            count: 3,
            persona: PersonaConfig {
                participant_name: "User".to_string(),
                assistant_name: "IRIS".to_string(),
                personality: String::new(),
                style_notes: String::new(),
                active_themes: vec![],
            },
        }
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_building_client() {
        let adapter = LlmAdapter::new(config(Provider::Gemini, None));
        let err = adapter.generate(&request()).await.unwrap_err();
        assert_eq!(err, GenerationError::MissingCredential { provider: Provider::Gemini });
        assert!(!adapter.is_initialized());
    }

    #[tokio::test]
    async fn test_blank_key_counts_as_missing() {
        let adapter = LlmAdapter::new(config(Provider::Claude, Some("   ")));
        let err = adapter.generate(&request()).await.unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_client_is_built_once() {
        let adapter = LlmAdapter::new(config(Provider::OpenAI, Some("sk-test")));
        let first = adapter.client().await.unwrap() as *const ProviderClient;
        let second = adapter.client().await.unwrap() as *const ProviderClient;
        assert_eq!(first, second);
        assert!(adapter.is_initialized());
    }
}
