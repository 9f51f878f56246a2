//! OpenAI-compatible text generator.
//!
//! Works with any endpoint exposing `/chat/completions` and `/models`
//! (OpenAI, OpenRouter, Ollama, vLLM, Gemini's OpenAI-compatible surface).
//! Prompts are sent as a single user message and never logged.

use async_trait::async_trait;
use assistline_core::backend::{Generation, GenerationRequest, TextGenerator};
use assistline_core::error::ProviderError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Per-request transport timeout; callers enforce their own deadline on top.
const HTTP_TIMEOUT_SECS: u64 = 60;

/// A text generator backed by an OpenAI-compatible chat endpoint.
pub struct OpenAiCompatGenerator {
    name: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiCompatGenerator {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            temperature: 0.2,
            max_tokens: 512,
            client,
        })
    }

    /// Build from the `[generator]` config section.
    pub fn from_config(config: &assistline_config::GeneratorConfig) -> Result<Self, ProviderError> {
        Ok(Self::new(
            config.provider.clone(),
            config.api_url.clone(),
            config.api_key.clone(),
            config.model.clone(),
        )?
        .with_defaults(config.temperature, config.max_tokens))
    }

    /// Defaults applied when a request leaves them unset.
    pub fn with_defaults(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, request: &GenerationRequest) -> ApiRequest {
        ApiRequest {
            model: self.model.clone(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: request.prompt.clone(),
            }],
            temperature: request.temperature.unwrap_or(self.temperature),
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            stream: false,
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }
}

/// Confidence-like score from the completion's `finish_reason`.
pub fn score_for_finish_reason(finish_reason: Option<&str>) -> f32 {
    match finish_reason {
        Some("stop") => 0.85,
        Some("length") => 0.6,
        _ => 0.5,
    }
}

/// Extract text and score from a completion response.
fn parse_response(response: ApiResponse) -> Result<Generation, ProviderError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".into()))?;

    let text = choice.message.content.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(ProviderError::InvalidResponse("empty completion".into()));
    }

    Ok(Generation {
        score: score_for_finish_reason(choice.finish_reason.as_deref()),
        text,
        model: response.model,
    })
}

#[async_trait]
impl TextGenerator for OpenAiCompatGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: GenerationRequest) -> Result<Generation, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);

        debug!(
            provider = %self.name,
            model = %self.model,
            prompt_len = request.prompt.len(),
            "Sending generation request"
        );

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            warn!(provider = %self.name, status, "Generator returned error");
            return Err(ProviderError::Api {
                status_code: status,
                message,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("failed to parse response: {e}")))?;

        parse_response(api_response)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types ---

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
