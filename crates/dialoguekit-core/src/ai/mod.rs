pub mod claude;
pub mod gemini;
pub mod ollama;
pub mod openai;

pub use claude::ClaudeClient;
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

use std::time::Duration;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use crate::error::{GenerationError, GenerationResult};

/// Sampling options sent with every generation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.75,
            top_p: 0.95,
            top_k: 40,
        }
    }
}

pub(crate) fn http_client(timeout: Duration) -> GenerationResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GenerationError::Client(e.to_string()))
}

pub(crate) fn transport_error(provider: &'static str, err: reqwest::Error) -> GenerationError {
    let message = if err.is_timeout() {
        format!("request timed out ({err})")
    } else {
        err.to_string()
    };
    GenerationError::Transport { provider, message }
}

/// Turn a non-success response into an `Api` error, keeping the service's own message
pub(crate) async fn check_status(provider: &'static str, response: Response) -> GenerationResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(GenerationError::Api {
        provider,
        status,
        message: extract_error_message(&body),
    })
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed {
        message: Option<String>,
        status: Option<String>,
    },
    Plain(String),
}

/// Pull the human-readable message out of a provider error body
///
/// Gemini, OpenAI and Claude nest it under `error.message`; Ollama uses a
/// bare `error` string. Anything else is returned as-is.
fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorWrapper>(body) {
        Ok(ErrorWrapper { error: ErrorBody::Plain(message) }) => message,
        Ok(ErrorWrapper { error: ErrorBody::Detailed { message, status } }) => {
            let message = message.unwrap_or_else(|| body.to_string());
            match status {
                Some(status) if !status.is_empty() => format!("{status}: {message}"),
                _ => message,
            }
        }
        Err(_) => body.to_string(),
    }
}
