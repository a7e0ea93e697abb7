use std::time::Duration;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use super::{check_status, http_client, transport_error, GenerationOptions};
use crate::error::{GenerationError, GenerationResult};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const PROVIDER: &str = "Gemini";

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: String,
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    system_instruction: GeminiContent,
    generation_config: GeminiGenerationConfig,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, timeout: Duration) -> GenerationResult<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.to_string(),
            base_url: BASE_URL.to_string(),
        })
    }

    /// Single non-streaming `generateContent` call with JSON output requested
    pub async fn generate(
        &self,
        model: &str,
        instruction: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> GenerationResult<String> {
        let url = format!("{}/{}:generateContent", self.base_url, model);

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: prompt.to_string() }],
            }],
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: instruction.to_string() }],
            },
            generation_config: GeminiGenerationConfig {
                response_mime_type: "application/json".to_string(),
                temperature: options.temperature,
                top_p: options.top_p,
                top_k: options.top_k,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let response = check_status(PROVIDER, response).await?;

        let gemini_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedPayload(format!("Gemini envelope: {e}")))?;

        extract_text(gemini_response)
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gemini-2.5-flash".to_string(),
            "gemini-2.5-pro".to_string(),
            "gemini-2.0-flash".to_string(),
        ]
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GeminiResponse) -> GenerationResult<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GenerationError::EmptyResponse { provider: PROVIDER });
    }
    Ok(text)
}
