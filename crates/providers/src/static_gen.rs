//! Fixed-output generator for offline mode and tests.

use async_trait::async_trait;
use assistline_core::backend::{Generation, GenerationRequest, TextGenerator};
use assistline_core::error::ProviderError;

/// Always returns the same text and score.
pub struct StaticGenerator {
    text: String,
    score: f32,
}

impl StaticGenerator {
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            score: score.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl TextGenerator for StaticGenerator {
    fn name(&self) -> &str {
        "static"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<Generation, ProviderError> {
        Ok(Generation {
            text: self.text.clone(),
            score: self.score,
            model: "static".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_fixed_text() {
        let generator = StaticGenerator::new("Offer to schedule a follow-up.", 1.7);
        let generation = generator.generate(GenerationRequest::new("anything")).await.unwrap();
        assert_eq!(generation.text, "Offer to schedule a follow-up.");
        assert_eq!(generation.score, 1.0);
        assert!(generator.health_check().await.unwrap());
    }
}
