//! Provider registry: resolves the configured backends once at startup.
//!
//! The rest of the system only sees the trait objects; nothing downstream
//! branches on provider names.

use std::sync::Arc;

use assistline_config::AppConfig;
use assistline_core::backend::{CrmProvider, IntentDetector, TextGenerator};
use assistline_core::error::{CrmError, Error, Result};
use tracing::{info, warn};

use crate::crm::{InMemoryCrm, RestCrm};
use crate::intent::HttpIntentDetector;
use crate::openai_compat::OpenAiCompatGenerator;
use crate::static_gen::StaticGenerator;

/// Generator provider names that speak the OpenAI chat-completions dialect.
const OPENAI_COMPATIBLE: &[&str] = &["openai", "openrouter", "gemini", "ollama", "custom"];

/// Providers that work without an API key.
const KEYLESS: &[&str] = &["ollama", "custom"];

const DEFAULT_STATIC_TEXT: &str = "No generated content available in offline mode.";

/// The resolved backend set.
#[derive(Clone)]
pub struct ProviderRegistry {
    /// `None` when no generator is configured; generator-backed capabilities
    /// are then not registered.
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub intent: Option<Arc<dyn IntentDetector>>,
    pub crm: Arc<dyn CrmProvider>,
    pub language_code: String,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("generator", &self.generator.as_ref().map(|g| g.name().to_string()))
            .field("intent", &self.intent.as_ref().map(|i| i.name().to_string()))
            .field("crm", &self.crm.name())
            .finish()
    }
}

impl ProviderRegistry {
    /// A registry with only in-process backends.
    pub fn offline() -> Self {
        Self {
            generator: None,
            intent: None,
            crm: Arc::new(InMemoryCrm::new()),
            language_code: "en-US".into(),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_intent(mut self, intent: Arc<dyn IntentDetector>) -> Self {
        self.intent = Some(intent);
        self
    }

    pub fn with_crm(mut self, crm: Arc<dyn CrmProvider>) -> Self {
        self.crm = crm;
        self
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let generator = resolve_generator(config)?;
        let intent = resolve_intent(config)?;
        let crm = resolve_crm(config)?;

        let registry = Self {
            generator,
            intent,
            crm,
            language_code: config.intent.language_code.clone(),
        };
        info!(registry = ?registry, "Providers resolved");
        Ok(registry)
    }
}

fn resolve_generator(config: &AppConfig) -> Result<Option<Arc<dyn TextGenerator>>> {
    let generator = &config.generator;
    let name = generator.provider.as_str();

    if name == "none" {
        return Ok(None);
    }

    if name == "static" {
        let text = generator
            .static_text
            .clone()
            .unwrap_or_else(|| DEFAULT_STATIC_TEXT.to_string());
        return Ok(Some(Arc::new(StaticGenerator::new(text, 0.5))));
    }

    if !OPENAI_COMPATIBLE.contains(&name) {
        return Err(Error::Config {
            message: format!("Unknown generator provider: {name}"),
        });
    }

    if generator.api_key.is_none() && !KEYLESS.contains(&name) {
        warn!(provider = name, "No generator API key set; generated capabilities disabled");
        return Ok(None);
    }

    Ok(Some(Arc::new(OpenAiCompatGenerator::from_config(generator)?)))
}

fn resolve_intent(config: &AppConfig) -> Result<Option<Arc<dyn IntentDetector>>> {
    let intent = &config.intent;
    if !intent.enabled {
        return Ok(None);
    }
    let endpoint = intent.endpoint.clone().ok_or_else(|| Error::Config {
        message: "intent.endpoint is required when intent detection is enabled".into(),
    })?;
    Ok(Some(Arc::new(HttpIntentDetector::new(
        endpoint,
        intent.api_key.clone(),
    )?)))
}

fn resolve_crm(config: &AppConfig) -> Result<Arc<dyn CrmProvider>> {
    let crm = &config.crm;
    match crm.provider.as_str() {
        "memory" => Ok(Arc::new(InMemoryCrm::new())),
        "rest" => {
            let endpoint = crm.endpoint.clone().ok_or_else(|| Error::Config {
                message: "crm.endpoint is required for the rest CRM provider".into(),
            })?;
            Ok(Arc::new(RestCrm::new(endpoint, crm.api_key.clone())?))
        }
        other => Err(CrmError::UnknownProvider(other.to_string()).into()),
    }
}
