//! Hand-written backend doubles for adapter tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use assistline_core::backend::{Generation, GenerationRequest, IntentDetector, IntentMatch, TextGenerator};
use assistline_core::capability::CapabilityContext;
use assistline_core::error::ProviderError;
use assistline_core::message::{ConversationId, Message, Role};
use async_trait::async_trait;

pub fn context(messages: &[(&str, &str)]) -> Arc<CapabilityContext> {
    Arc::new(CapabilityContext {
        conversation_id: ConversationId::parse("conv-1").unwrap(),
        messages: messages
            .iter()
            .map(|(role, text)| Message::new(role.parse::<Role>().unwrap(), *text, None).unwrap())
            .collect(),
        redacted: true,
    })
}

/// Returns a fixed generation (or error) and remembers the prompts it saw.
pub struct RecordingGenerator {
    result: Result<Generation, ProviderError>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl RecordingGenerator {
    pub fn new(text: &str, score: f32) -> Self {
        Self {
            result: Ok(Generation {
                text: text.into(),
                score,
                model: "mock".into(),
            }),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            result: Err(error),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<Generation, ProviderError> {
        self.prompts.lock().unwrap().push(request.prompt);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}

pub struct StubIntent {
    result: Result<IntentMatch, ProviderError>,
    sessions: Mutex<Vec<String>>,
}

impl StubIntent {
    pub fn matching(name: &str, confidence: f32) -> Self {
        Self {
            result: Ok(IntentMatch {
                name: name.into(),
                confidence,
                parameters: serde_json::Map::new(),
                fulfillment_text: None,
            }),
            sessions: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            result: Err(error),
            sessions: Mutex::new(Vec::new()),
        }
    }

    pub fn last_session(&self) -> Option<String> {
        self.sessions.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl IntentDetector for StubIntent {
    fn name(&self) -> &str {
        "stub"
    }

    async fn detect_intent(
        &self,
        session_id: &str,
        _text: &str,
        _language_code: &str,
    ) -> Result<IntentMatch, ProviderError> {
        self.sessions.lock().unwrap().push(session_id.to_string());
        self.result.clone()
    }
}
