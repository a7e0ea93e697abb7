use std::time::Duration;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use super::{check_status, http_client, transport_error, GenerationOptions};
use crate::error::{GenerationError, GenerationResult};

const PROVIDER: &str = "Claude";

#[derive(Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ClaudeMessage>,
    // Newer models refuse temperature and top_p together; only temperature is sent
    temperature: f32,
}

#[derive(Deserialize)]
struct ClaudeContent {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str, timeout: Duration) -> GenerationResult<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.to_string(),
        })
    }

    pub async fn generate(
        &self,
        model: &str,
        instruction: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> GenerationResult<String> {
        let request = ClaudeRequest {
            model: model.to_string(),
            max_tokens: 8192,
            system: instruction.to_string(),
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: options.temperature,
        };

        let response = self.client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let response = check_status(PROVIDER, response).await?;

        let claude_response: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedPayload(format!("Claude envelope: {e}")))?;
        let text: String = claude_response.content
            .into_iter()
            .filter_map(|c| c.text)
            .collect();
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse { provider: PROVIDER });
        }
        Ok(text)
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "claude-sonnet-4-20250514".to_string(),
            "claude-3-5-sonnet-20241022".to_string(),
            "claude-3-5-haiku-20241022".to_string(),
        ]
    }
}
