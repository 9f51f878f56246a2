//! Summary capability: condenses the redacted window.

use std::sync::Arc;

use assistline_core::backend::{GenerationRequest, TextGenerator};
use assistline_core::capability::{
    CapabilityAdapter, CapabilityContext, CapabilityFailure, CapabilityKind, CapabilityOutput,
    within_deadline,
};
use async_trait::async_trait;
use tokio::time::Instant;

use crate::prompt;

pub struct SummaryAdapter {
    generator: Arc<dyn TextGenerator>,
}

impl SummaryAdapter {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl CapabilityAdapter for SummaryAdapter {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Summary
    }

    fn provider(&self) -> &str {
        self.generator.name()
    }

    async fn invoke(
        &self,
        context: Arc<CapabilityContext>,
        deadline: Instant,
    ) -> Result<CapabilityOutput, CapabilityFailure> {
        let request = GenerationRequest::new(prompt::summary(&context.transcript())).with_max_tokens(300);
        let generation = within_deadline(deadline, self.generator.generate(request)).await?;

        let summary = generation.text.trim();
        if summary.is_empty() {
            return Err(CapabilityFailure::InvalidResponse("empty summary".into()));
        }
        Ok(CapabilityOutput::Summary(summary.to_string()))
    }

    async fn health_check(&self) -> bool {
        self.generator.health_check().await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingGenerator, context};
    use std::time::Duration;

    #[tokio::test]
    async fn summarizes_transcript() {
        let generator = Arc::new(RecordingGenerator::new("  - Customer needs a refill\n", 0.85));
        let adapter = SummaryAdapter::new(generator.clone());
        let ctx = context(&[("customer", "I need a refill"), ("agent", "Sure, which medication?")]);

        let output = adapter
            .invoke(ctx, Instant::now() + Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(output, CapabilityOutput::Summary("- Customer needs a refill".into()));

        let prompt = generator.last_prompt();
        assert!(prompt.contains("CUSTOMER: I need a refill\nAGENT: Sure, which medication?"));
    }

    #[tokio::test]
    async fn blank_output_is_invalid() {
        let adapter = SummaryAdapter::new(Arc::new(RecordingGenerator::new("   ", 0.85)));
        let err = adapter
            .invoke(context(&[("customer", "hi")]), Instant::now() + Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "invalid_response");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_generator_times_out() {
        let generator = RecordingGenerator::new("late", 0.85).with_delay(Duration::from_secs(10));
        let adapter = SummaryAdapter::new(Arc::new(generator));
        let err = adapter
            .invoke(context(&[("customer", "hi")]), Instant::now() + Duration::from_millis(200))
            .await
            .unwrap_err();
        assert_eq!(err, CapabilityFailure::Timeout);
    }
}
