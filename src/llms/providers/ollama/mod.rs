//! Ollama text-generation provider.
//!
//! Talks to a locally running Ollama server through its non-streaming
//! `/api/generate` endpoint. Default endpoint: `http://localhost:11434`.
//!
//! The server returns only the completion; this provider prepends the prompt
//! so callers see the same shape a causal-LM pipeline produces and can cut
//! the reply out after their cue marker.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llms::base_llm::{generate_call_id, GenerationRequest, TextGenerator};
use crate::utilities::config::EngineConfig;
use crate::utilities::errors::GenerationError;

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Clone, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f64,
    top_p: f64,
}

/// The parts of the `/api/generate` answer we read.
#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Ollama-backed [`TextGenerator`].
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    config: EngineConfig,
    client: reqwest::Client,
}

impl OllamaGenerator {
    /// Build a client with the configured timeout.
    pub fn new(config: EngineConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }

    /// Ask the server to load the model. An empty prompt makes Ollama load
    /// the weights without generating anything.
    pub async fn warm_up(&self) -> Result<(), GenerationError> {
        log::info!(
            "Loading model '{}' from {}",
            self.config.model,
            self.config.base_url
        );
        let body = serde_json::json!({ "model": self.config.model, "stream": false });
        let response = self.client.post(self.endpoint()).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::EngineUnavailable(format!(
                "model load failed ({}): {}",
                status, text
            )));
        }
        Ok(())
    }
}

/// Turn a raw `/api/generate` body into the generated text.
fn parse_generate_response(body: &str) -> Result<String, GenerationError> {
    let parsed: GenerateResponse = serde_json::from_str(body).map_err(|e| {
        GenerationError::EngineUnavailable(format!(
            "failed to parse Ollama response: {} - Body: {}",
            e,
            body.chars().take(200).collect::<String>()
        ))
    })?;
    if let Some(error) = parsed.error {
        return Err(GenerationError::EngineUnavailable(error));
    }
    parsed
        .response
        .ok_or_else(|| GenerationError::EngineUnavailable("response field missing".into()))
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        request.validate()?;

        let call_id = generate_call_id();
        log::debug!(
            "OllamaGenerator.generate[{}]: model={}, prompt_chars={}, max_tokens={}, temperature={}, top_p={}",
            call_id,
            self.config.model,
            request.prompt.chars().count(),
            request.max_tokens,
            request.temperature,
            request.top_p,
        );

        let body = GenerateBody {
            model: &self.config.model,
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: request.max_tokens,
                temperature: request.temperature,
                top_p: request.top_p,
            },
        };

        let response = self.client.post(self.endpoint()).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            // Ollama reports errors as {"error": "..."} with a non-2xx status.
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(text);
            return Err(GenerationError::EngineUnavailable(format!(
                "Ollama API error ({}): {}",
                status, detail
            )));
        }

        let completion = parse_generate_response(&text)?;
        log::debug!(
            "OllamaGenerator.generate[{}]: {} chars generated",
            call_id,
            completion.chars().count()
        );
        Ok(format!("{}{}", request.prompt, completion))
    }
}
