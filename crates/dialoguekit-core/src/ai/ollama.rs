use std::time::Duration;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use super::{check_status, http_client, transport_error, GenerationOptions};
use crate::error::{GenerationError, GenerationResult};

const PROVIDER: &str = "Ollama";

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    system: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<Value>,
    options: OllamaOptions,
}

/// Structured-output schema for a batch of conversations.
///
/// Plain `"json"` mode only allows an object at the root, so the array shape
/// has to be spelled out.
fn conversation_batch_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "theme": { "type": "string" },
                "conversation": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["theme", "conversation"]
        }
    })
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout: Duration) -> GenerationResult<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn generate(
        &self,
        model: &str,
        instruction: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> GenerationResult<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: model.to_string(),
            system: instruction.to_string(),
            prompt: prompt.to_string(),
            stream: false,
            format: Some(conversation_batch_schema()),
            options: OllamaOptions {
                temperature: options.temperature,
                top_p: options.top_p,
                top_k: options.top_k,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let response = check_status(PROVIDER, response).await?;

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedPayload(format!("Ollama envelope: {e}")))?;
        Ok(ollama_response.response)
    }

    pub async fn list_models(&self) -> GenerationResult<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let response = check_status(PROVIDER, response).await?;

        let models_response: OllamaModelsResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedPayload(format!("Ollama model list: {e}")))?;
        let model_names: Vec<String> = models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect();

        Ok(model_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_asks_for_array_without_streaming() {
        let request = OllamaRequest {
            model: "llama3.2:latest".to_string(),
            system: "sys".to_string(),
            prompt: "hi".to_string(),
            stream: false,
            format: Some(conversation_batch_schema()),
            options: OllamaOptions { temperature: 0.75, top_p: 0.95, top_k: 40 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["format"]["type"], "array");
        assert_eq!(json["options"]["top_k"], 40);
    }

    #[test]
    fn test_schema_requires_theme_and_conversation() {
        let schema = conversation_batch_schema();
        let item = &schema["items"];
        assert_eq!(item["type"], "object");
        assert_eq!(item["required"], json!(["theme", "conversation"]));
        assert_eq!(item["properties"]["conversation"]["items"]["type"], "string");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = OllamaClient::new("http://localhost:11434/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }
}
