//! Backend clients for assistline.
//!
//! Implements the `assistline_core` backend traits: text generation, intent
//! detection, and CRM access. The registry resolves them from configuration.

pub mod crm;
pub mod intent;
pub mod openai_compat;
pub mod registry;
pub mod static_gen;

pub use crm::{InMemoryCrm, RestCrm};
pub use intent::HttpIntentDetector;
pub use openai_compat::OpenAiCompatGenerator;
pub use registry::ProviderRegistry;
pub use static_gen::StaticGenerator;
