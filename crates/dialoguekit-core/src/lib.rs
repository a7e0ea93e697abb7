pub mod adapter;
pub mod ai;
pub mod config;
pub mod error;
pub mod export;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod state;
pub mod themes;
pub mod validator;

// Re-export main types for convenience
pub use adapter::{AdapterConfig, DialogueSource, GenerationRequest, LlmAdapter};
pub use ai::{ClaudeClient, GeminiClient, GenerationOptions, OllamaClient, OpenAIClient};
pub use config::Settings;
pub use error::{GenerationError, GenerationResult};
pub use orchestrator::{Orchestrator, RunNotice, RunProgress, RunReport, DEFAULT_TARGET_TOTAL};
pub use provider::Provider;
pub use state::{ConversationItem, PersonaConfig, SettingsSnapshot, Speaker};
pub use themes::{Theme, THEME_CATALOG};
pub use validator::{validate_response, ValidationReport};
