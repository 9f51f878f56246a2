//! Assist orchestration for assistline.
//!
//! Reads a conversation window, redacts it once, fans the shared context out
//! to the requested capability adapters, and merges whatever completes
//! before the deadline into one [`AssistResult`](assistline_core::AssistResult).

pub mod health;
pub mod orchestrator;
pub mod wrap_up;

pub use health::{CapabilityHealth, HealthReport};
pub use orchestrator::AssistOrchestrator;
pub use wrap_up::WrapUpOutcome;

#[cfg(test)]
pub(crate) mod test_helpers;
