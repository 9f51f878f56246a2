//! Shared gateway state, assembled once at startup.

use std::sync::Arc;

use assistline_channels::{ContactCenterHandler, SignatureVerifier};
use assistline_config::AppConfig;
use assistline_core::backend::IntentDetector;
use assistline_core::error::Result;
use assistline_core::ledger::ConversationLedger;
use assistline_ledger::InMemoryLedger;
use assistline_orchestrator::AssistOrchestrator;
use assistline_providers::ProviderRegistry;
use assistline_security::{AuditRecorder, Redactor};
use assistline_telemetry::TelemetryEngine;
use chrono::{DateTime, Utc};

/// Everything the handlers need. Built once, shared behind an `Arc`.
pub struct AppState {
    pub config: AppConfig,
    pub ledger: Arc<dyn ConversationLedger>,
    pub orchestrator: Arc<AssistOrchestrator>,
    pub redactor: Arc<Redactor>,
    pub audit: Arc<AuditRecorder>,
    pub telemetry: Arc<TelemetryEngine>,
    pub inbound: Arc<ContactCenterHandler>,
    pub intent: Option<Arc<dyn IntentDetector>>,
    pub start_time: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Resolve providers from `config` and wire the engine.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let registry = ProviderRegistry::from_config(&config)?;
        Self::assemble(config, registry)
    }

    /// Wire the engine around an already-resolved registry.
    pub fn assemble(config: AppConfig, registry: ProviderRegistry) -> Result<Self> {
        let redactor = Arc::new(Redactor::from_config(&config.redaction)?);
        let telemetry = Arc::new(TelemetryEngine::new());
        let audit = Arc::new(AuditRecorder::from_config(&config.audit).with_sink(telemetry.clone()));
        let ledger: Arc<dyn ConversationLedger> = Arc::new(InMemoryLedger::new());

        let orchestrator = AssistOrchestrator::new(ledger.clone(), redactor.clone(), audit.clone())
            .with_adapters(assistline_capabilities::adapters_from_registry(&registry))
            .with_crm(registry.crm.clone())
            .with_history_window(config.assist.history_window)
            .with_redaction(config.redaction.enabled)
            .with_confidence(config.assist.confidence);

        let inbound = ContactCenterHandler::new(
            ledger.clone(),
            audit.clone(),
            SignatureVerifier::from_config(&config.contact_center),
        );

        Ok(Self {
            ledger,
            orchestrator: Arc::new(orchestrator),
            redactor,
            audit,
            telemetry,
            inbound: Arc::new(inbound),
            intent: registry.intent.clone(),
            start_time: Utc::now(),
            config,
        })
    }
}
