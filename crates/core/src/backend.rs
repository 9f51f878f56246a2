//! Backend traits: the external collaborators behind the capability adapters.
//!
//! - [`TextGenerator`]: a language-model text generation endpoint
//! - [`IntentDetector`]: the conversational-intent (dialog flow) engine
//! - [`CrmProvider`]: the customer-record system
//!
//! Only their interfaces are defined here; thin clients live in
//! `assistline-providers`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CrmError, ProviderError};

/// A text generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The full prompt (already built from redacted context)
    pub prompt: String,

    /// Temperature (0.0 = deterministic). `None` uses the backend default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate. `None` uses the backend default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Generated text plus a confidence-like score in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub score: f32,
    /// Which model actually responded
    #[serde(default)]
    pub model: String,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// A human-readable name for this backend (e.g. "openai", "static").
    fn name(&self) -> &str;

    /// Generate text for a prompt. May be slow or fail.
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, ProviderError>;

    /// Health check: can we reach the backend?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}

/// The result of intent detection for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentMatch {
    pub name: String,
    pub confidence: f32,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub fulfillment_text: Option<String>,
}

#[async_trait]
pub trait IntentDetector: Send + Sync {
    fn name(&self) -> &str;

    async fn detect_intent(
        &self,
        session_id: &str,
        text: &str,
        language_code: &str,
    ) -> Result<IntentMatch, ProviderError>;

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}

/// A customer record as returned by the CRM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// A new support case to open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCase {
    pub customer_id: String,
    pub subject: String,
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: String,
}

fn default_priority() -> String {
    "normal".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub case_id: String,
    pub customer_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// A conversation summary written back to the CRM after the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationLog {
    pub customer_id: String,
    pub conversation_id: String,
    /// Redacted summary text
    pub summary: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub log_id: String,
    pub logged_at: DateTime<Utc>,
}

#[async_trait]
pub trait CrmProvider: Send + Sync {
    /// The provider name it was resolved by (e.g. "memory", "rest").
    fn name(&self) -> &str;

    async fn get_customer(&self, customer_id: &str) -> Result<CustomerRecord, CrmError>;

    async fn create_case(&self, case: NewCase) -> Result<CaseRecord, CrmError>;

    async fn log_conversation(&self, log: ConversationLog) -> Result<LogRecord, CrmError>;

    async fn health_check(&self) -> Result<bool, CrmError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_request_defaults() {
        let req = GenerationRequest::new("Summarize");
        assert!(req.temperature.is_none());
        assert!(req.max_tokens.is_none());

        let req = req.with_max_tokens(256).with_temperature(0.0);
        assert_eq!(req.max_tokens, Some(256));
        assert_eq!(req.temperature, Some(0.0));
    }

    #[test]
    fn new_case_priority_defaults_to_normal() {
        let case: NewCase = serde_json::from_str(
            r#"{"customer_id":"c1","subject":"Refill","description":"Requested refill"}"#,
        )
        .unwrap();
        assert_eq!(case.priority, "normal");
    }
}
