//! Knowledge capability: a short snippet relevant to the customer's question.

use std::sync::Arc;

use assistline_core::assist::KnowledgeSnippet;
use assistline_core::backend::{GenerationRequest, TextGenerator};
use assistline_core::capability::{
    CapabilityAdapter, CapabilityContext, CapabilityFailure, CapabilityKind, CapabilityOutput,
    within_deadline,
};
use async_trait::async_trait;
use tokio::time::Instant;

use crate::prompt;

pub struct KnowledgeAdapter {
    generator: Arc<dyn TextGenerator>,
}

impl KnowledgeAdapter {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl CapabilityAdapter for KnowledgeAdapter {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Knowledge
    }

    fn provider(&self) -> &str {
        self.generator.name()
    }

    async fn invoke(
        &self,
        context: Arc<CapabilityContext>,
        deadline: Instant,
    ) -> Result<CapabilityOutput, CapabilityFailure> {
        let query = context
            .last_customer_text()
            .ok_or_else(|| CapabilityFailure::InvalidResponse("no customer message to look up".into()))?;

        let request = GenerationRequest::new(prompt::knowledge(query)).with_max_tokens(200);
        let generation = within_deadline(deadline, self.generator.generate(request)).await?;

        let snippet = generation.text.trim();
        if snippet.is_empty() {
            return Err(CapabilityFailure::InvalidResponse("empty snippet".into()));
        }
        Ok(CapabilityOutput::Knowledge(vec![KnowledgeSnippet {
            snippet: snippet.to_string(),
            relevance_score: generation.score.clamp(0.0, 1.0),
        }]))
    }

    async fn health_check(&self) -> bool {
        self.generator.health_check().await.unwrap_or(false)
    }
}
