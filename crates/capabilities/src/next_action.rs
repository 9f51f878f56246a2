//! Next-best-action capability.
//!
//! Uses the intent engine when one is configured and its answer maps onto a
//! known action; otherwise falls back to keyword rules over the last message.

use std::sync::Arc;

use assistline_core::backend::IntentDetector;
use assistline_core::capability::{
    CapabilityAdapter, CapabilityContext, CapabilityFailure, CapabilityKind, CapabilityOutput,
    within_deadline,
};
use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

/// Intents below this confidence are not trusted.
const MIN_INTENT_CONFIDENCE: f32 = 0.5;

const GREETING_ACTION: &str = "Greet customer and ask how you can help";
const DEFAULT_ACTION: &str = "Clarify customer's primary concern";

/// Keyword rules, checked in order against the lowercased last message.
const KEYWORD_RULES: &[(&[&str], &str)] = &[
    (&["appointment", "schedule", "book"], "Offer available appointment slots"),
    (&["bill", "charge", "cost", "insurance"], "Look up customer billing information"),
    (
        &["prescription", "medication", "refill"],
        "Check prescription status and process refill",
    ),
    (
        &["results", "test", "lab"],
        "Verify results are available and offer to send securely",
    ),
    (
        &["speak", "talk", "representative", "person"],
        "Prepare for escalation to specialized team",
    ),
];

/// Intent name → action.
const INTENT_ACTIONS: &[(&str, &str)] = &[
    ("appointment.schedule", "Offer available appointment slots"),
    ("appointment.reschedule", "Look up the existing appointment and offer new slots"),
    ("appointment.cancel", "Confirm the appointment to cancel and offer to rebook"),
    ("insurance.coverage", "Verify insurance coverage for the requested service"),
    ("billing.inquiry", "Look up customer billing information"),
    ("prescription.refill", "Check prescription status and process refill"),
    ("prescription.status", "Check prescription status and share the update"),
    ("lab.results", "Verify results are available and offer to send securely"),
    ("provider.availability", "Check provider availability"),
    ("agent.handoff", "Prepare for escalation to specialized team"),
];

/// Keyword heuristic over the last message of the window.
pub fn heuristic_action(context: &CapabilityContext) -> &'static str {
    let Some(last) = context.messages.last() else {
        return GREETING_ACTION;
    };
    let text = last.text.to_lowercase();
    KEYWORD_RULES
        .iter()
        .find(|(words, _)| words.iter().any(|w| text.contains(w)))
        .map(|(_, action)| *action)
        .unwrap_or(DEFAULT_ACTION)
}

pub fn action_for_intent(intent: &str) -> Option<&'static str> {
    INTENT_ACTIONS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(intent))
        .map(|(_, action)| *action)
}

pub struct NextActionAdapter {
    intent: Option<Arc<dyn IntentDetector>>,
    language_code: String,
}

impl NextActionAdapter {
    /// Heuristics only.
    pub fn heuristic() -> Self {
        Self {
            intent: None,
            language_code: "en-US".into(),
        }
    }

    pub fn with_intent(intent: Arc<dyn IntentDetector>, language_code: impl Into<String>) -> Self {
        Self {
            intent: Some(intent),
            language_code: language_code.into(),
        }
    }

    async fn from_intent(
        &self,
        intent: &dyn IntentDetector,
        context: &CapabilityContext,
        deadline: Instant,
    ) -> Result<Option<&'static str>, CapabilityFailure> {
        let Some(text) = context.last_customer_text() else {
            return Ok(None);
        };
        let detected = within_deadline(
            deadline,
            intent.detect_intent(context.conversation_id.as_str(), text, &self.language_code),
        )
        .await?;

        if detected.confidence < MIN_INTENT_CONFIDENCE {
            return Ok(None);
        }
        Ok(action_for_intent(&detected.name))
    }
}

#[async_trait]
impl CapabilityAdapter for NextActionAdapter {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::NextAction
    }

    fn provider(&self) -> &str {
        match &self.intent {
            Some(intent) => intent.name(),
            None => "heuristic",
        }
    }

    async fn invoke(
        &self,
        context: Arc<CapabilityContext>,
        deadline: Instant,
    ) -> Result<CapabilityOutput, CapabilityFailure> {
        if let Some(intent) = &self.intent {
            match self.from_intent(intent.as_ref(), &context, deadline).await {
                Ok(Some(action)) => return Ok(CapabilityOutput::NextAction(action.into())),
                Ok(None) => {}
                // Past the deadline there is no time left for the fallback either.
                Err(CapabilityFailure::Timeout) => return Err(CapabilityFailure::Timeout),
                Err(failure) => {
                    debug!(reason = failure.reason(), "Intent detection failed, using heuristics");
                }
            }
        }
        Ok(CapabilityOutput::NextAction(heuristic_action(&context).into()))
    }

    async fn health_check(&self) -> bool {
        match &self.intent {
            Some(intent) => intent.health_check().await.unwrap_or(false),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubIntent, context};
    use assistline_core::error::ProviderError;
    use std::time::Duration;

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(1)
    }

    async fn action(adapter: &NextActionAdapter, messages: &[(&str, &str)]) -> String {
        match adapter.invoke(context(messages), deadline()).await.unwrap() {
            CapabilityOutput::NextAction(action) => action,
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn keyword_rules() {
        let adapter = NextActionAdapter::heuristic();
        assert_eq!(adapter.provider(), "heuristic");
        assert_eq!(action(&adapter, &[]).await, GREETING_ACTION);
        assert_eq!(
            action(&adapter, &[("customer", "Can I book an appointment?")]).await,
            "Offer available appointment slots"
        );
        assert_eq!(
            action(&adapter, &[("customer", "Why was I charged twice?")]).await,
            "Look up customer billing information"
        );
        assert_eq!(
            action(&adapter, &[("customer", "I need a REFILL")]).await,
            "Check prescription status and process refill"
        );
        assert_eq!(
            action(&adapter, &[("customer", "Are my lab results in?")]).await,
            "Verify results are available and offer to send securely"
        );
        assert_eq!(
            action(&adapter, &[("customer", "Let me talk to someone else")]).await,
            "Prepare for escalation to specialized team"
        );
        assert_eq!(action(&adapter, &[("customer", "Hello there")]).await, DEFAULT_ACTION);
    }

    #[tokio::test]
    async fn heuristic_reads_last_message_of_any_role() {
        let adapter = NextActionAdapter::heuristic();
        let result = action(
            &adapter,
            &[("customer", "I need a refill"), ("agent", "Let me schedule that for you")],
        )
        .await;
        assert_eq!(result, "Offer available appointment slots");
    }

    #[tokio::test]
    async fn mapped_intent_wins() {
        let intent = Arc::new(StubIntent::matching("appointment.reschedule", 0.9));
        let adapter = NextActionAdapter::with_intent(intent.clone(), "en-US");
        let result = action(&adapter, &[("customer", "I need to move my visit")]).await;
        assert_eq!(result, "Look up the existing appointment and offer new slots");
        assert_eq!(intent.last_session(), Some("conv-1".to_string()));
    }

    #[tokio::test]
    async fn low_confidence_or_unknown_intent_falls_back() {
        let adapter = NextActionAdapter::with_intent(
            Arc::new(StubIntent::matching("appointment.schedule", 0.2)),
            "en-US",
        );
        assert_eq!(
            action(&adapter, &[("customer", "I need a refill")]).await,
            "Check prescription status and process refill"
        );

        let adapter = NextActionAdapter::with_intent(
            Arc::new(StubIntent::matching("small.talk", 0.99)),
            "en-US",
        );
        assert_eq!(action(&adapter, &[("customer", "Hello")]).await, DEFAULT_ACTION);
    }

    #[tokio::test]
    async fn detector_error_falls_back() {
        let adapter = NextActionAdapter::with_intent(
            Arc::new(StubIntent::failing(ProviderError::Network("refused".into()))),
            "en-US",
        );
        assert_eq!(
            action(&adapter, &[("customer", "What does this cost?")]).await,
            "Look up customer billing information"
        );
    }

    #[test]
    fn intent_lookup_is_case_insensitive() {
        assert_eq!(
            action_for_intent("Lab.Results"),
            Some("Verify results are available and offer to send securely")
        );
        assert_eq!(action_for_intent("unknown"), None);
    }
}
