//! HTTP client for an external intent-detection (dialog-flow) engine.
//!
//! Wire format: `POST {endpoint}` with `{session_id, text, language_code}`,
//! answered by `{intent: {name, confidence}, parameters, fulfillment_text}`.

use async_trait::async_trait;
use assistline_core::backend::{IntentDetector, IntentMatch};
use assistline_core::error::ProviderError;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub struct HttpIntentDetector {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpIntentDetector {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }
}

#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    session_id: &'a str,
    text: &'a str,
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    intent: WireIntent,
    #[serde(default)]
    parameters: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    fulfillment_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireIntent {
    name: String,
    #[serde(default)]
    confidence: f32,
}

impl From<DetectResponse> for IntentMatch {
    fn from(response: DetectResponse) -> Self {
        Self {
            name: response.intent.name,
            confidence: response.intent.confidence.clamp(0.0, 1.0),
            parameters: response.parameters,
            fulfillment_text: response.fulfillment_text.filter(|t| !t.trim().is_empty()),
        }
    }
}

#[async_trait]
impl IntentDetector for HttpIntentDetector {
    fn name(&self) -> &str {
        "http"
    }

    async fn detect_intent(
        &self,
        session_id: &str,
        text: &str,
        language_code: &str,
    ) -> Result<IntentMatch, ProviderError> {
        debug!(session_id, text_len = text.len(), "Detecting intent");

        let response = self
            .authorized(self.client.post(&self.endpoint))
            .json(&DetectRequest {
                session_id,
                text,
                language_code,
            })
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(ProviderError::Api {
                status_code: status,
                message: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: DetectResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(parsed.into())
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let response = self
            .authorized(self.client.get(&self.endpoint))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        // Any answer from the server means it is reachable.
        Ok(!response.status().is_server_error())
    }
}
