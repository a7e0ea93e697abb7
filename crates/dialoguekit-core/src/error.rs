//! Errors raised on the generation path
//!
//! Item-level defects never show up here: the validator absorbs them. Every
//! variant below is fatal for the theme that raised it.

use thiserror::Error;
use crate::provider::Provider;

pub type GenerationResult<T> = Result<T, GenerationError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// No usable API key for a provider that needs one
    #[error("Cannot generate: {} API key is missing. Set {} or add it in Settings.", .provider.display_name(), .provider.env_var().unwrap_or("a key"))]
    MissingCredential { provider: Provider },

    #[error("No dialogue themes selected. Please select at least one theme in Settings.")]
    NoActiveThemes,

    /// The request never produced a response (connect, timeout, TLS, ...)
    #[error("{provider} request failed: {message}")]
    Transport { provider: &'static str, message: String },

    /// The service answered with a non-success status
    #[error("{provider} API error {status}: {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// The response envelope had no text where the provider puts it
    #[error("{provider} returned no text in its response")]
    EmptyResponse { provider: &'static str },

    /// The payload text was not valid JSON
    #[error("Failed to parse JSON response: {0}")]
    MalformedPayload(String),

    /// The payload parsed but the top-level value was not an array
    #[error("Response was not a valid JSON array as expected (got {0})")]
    NotAnArray(&'static str),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl GenerationError {
    /// Precondition failures are reported before any external call
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            GenerationError::MissingCredential { .. } | GenerationError::NoActiveThemes
        )
    }
}
