use std::time::Duration;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use super::{check_status, http_client, transport_error, GenerationOptions};
use crate::error::{GenerationError, GenerationResult};

const PROVIDER: &str = "OpenAI";

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

// OpenAI has no top_k and its JSON mode only guarantees an object, not an
// array, so the prompt alone asks for the array.
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    top_p: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
}

impl OpenAIClient {
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
        let request = OpenAIRequest {
            model: model.to_string(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: instruction.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: options.temperature,
            top_p: options.top_p,
            stream: false,
        };

        let response = self.client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let response = check_status(PROVIDER, response).await?;

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedPayload(format!("OpenAI envelope: {e}")))?;
        openai_response.choices.into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(GenerationError::EmptyResponse { provider: PROVIDER })
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gpt-4o-mini".to_string(),
            "gpt-4o".to_string(),
            "gpt-4-turbo".to_string(),
        ]
    }
}
