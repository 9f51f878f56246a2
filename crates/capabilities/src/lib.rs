//! Capability adapters for assistline.
//!
//! Each adapter turns the shared, redacted conversation view into one
//! capability's payload:
//! - **summary**: bullet summary of the window
//! - **smart_replies**: up to three candidate agent replies
//! - **knowledge**: one snippet answering the customer's question
//! - **next_action**: intent-mapped or keyword-derived recommendation

pub mod knowledge;
pub mod next_action;
pub mod prompt;
pub mod replies;
pub mod summary;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use assistline_core::capability::CapabilityAdapter;
use assistline_providers::ProviderRegistry;

pub use knowledge::KnowledgeAdapter;
pub use next_action::NextActionAdapter;
pub use replies::SmartReplyAdapter;
pub use summary::SummaryAdapter;

/// Build the adapter set for the resolved providers.
///
/// Generator-backed capabilities are only present when a generator is
/// configured. Next action is always available.
pub fn adapters_from_registry(registry: &ProviderRegistry) -> Vec<Arc<dyn CapabilityAdapter>> {
    let mut adapters: Vec<Arc<dyn CapabilityAdapter>> = Vec::new();

    if let Some(generator) = &registry.generator {
        adapters.push(Arc::new(SummaryAdapter::new(generator.clone())));
        adapters.push(Arc::new(SmartReplyAdapter::new(generator.clone())));
        adapters.push(Arc::new(KnowledgeAdapter::new(generator.clone())));
    }

    adapters.push(match &registry.intent {
        Some(intent) => Arc::new(NextActionAdapter::with_intent(
            intent.clone(),
            registry.language_code.clone(),
        )),
        None => Arc::new(NextActionAdapter::heuristic()),
    });

    adapters
}

#[cfg(test)]
mod tests {
    use super::*;
    use assistline_core::CapabilityKind;
    use assistline_providers::StaticGenerator;

    #[test]
    fn offline_registry_has_next_action_only() {
        let adapters = adapters_from_registry(&ProviderRegistry::offline());
        let kinds: Vec<CapabilityKind> = adapters.iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, vec![CapabilityKind::NextAction]);
    }

    #[test]
    fn generator_enables_all_capabilities() {
        let registry = ProviderRegistry::offline()
            .with_generator(Arc::new(StaticGenerator::new("ok", 0.8)));
        let adapters = adapters_from_registry(&registry);
        assert_eq!(adapters.len(), 4);
        assert_eq!(adapters[0].provider(), "static");
    }
}
