//! End-of-conversation write-back: summarize, then log to the CRM.

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use assistline_core::backend::{ConversationLog, LogRecord};
use assistline_core::capability::{CapabilityKind, CapabilitySet};
use assistline_core::error::{Error, Result};
use assistline_core::message::ConversationId;

use crate::AssistOrchestrator;

const LOG_OPERATION: &str = "log_conversation";

/// What a wrap-up produced.
#[derive(Debug, Clone, Serialize)]
pub struct WrapUpOutcome {
    pub conversation_id: ConversationId,
    pub summary: Option<String>,
    /// Absent when no summary was available to log.
    pub log: Option<LogRecord>,
}

impl AssistOrchestrator {
    /// Summarize the conversation and log the (redacted) summary for
    /// `customer_id`.
    ///
    /// Nothing is written when the summary capability produced nothing
    /// before `deadline`.
    pub async fn wrap_up(
        &self,
        conversation_id: &ConversationId,
        customer_id: &str,
        deadline: Instant,
    ) -> Result<WrapUpOutcome> {
        let crm = self.crm.clone().ok_or_else(|| Error::Config {
            message: "no CRM provider configured".into(),
        })?;

        let requested = CapabilitySet::empty().with(CapabilityKind::Summary);
        let assist = self.get_assist(conversation_id, &requested, deadline).await?;

        let Some(summary) = assist.summary else {
            warn!(conversation_id = %conversation_id, "No summary available, skipping CRM log");
            return Ok(WrapUpOutcome {
                conversation_id: conversation_id.clone(),
                summary: None,
                log: None,
            });
        };

        let mut metadata = serde_json::Map::new();
        metadata.insert("redacted".into(), self.redaction_enabled().into());

        let written = crm
            .log_conversation(ConversationLog {
                customer_id: customer_id.to_string(),
                conversation_id: conversation_id.to_string(),
                summary: summary.clone(),
                metadata,
            })
            .await;

        self.audit
            .record_crm_write(conversation_id, LOG_OPERATION, written.is_ok());

        let record = written?;
        info!(
            conversation_id = %conversation_id,
            crm = crm.name(),
            log_id = %record.log_id,
            "Conversation logged"
        );

        Ok(WrapUpOutcome {
            conversation_id: conversation_id.clone(),
            summary: Some(summary),
            log: Some(record),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::test_helpers::{Harness, MockAdapter};
    use assistline_core::capability::CapabilityFailure;
    use assistline_providers::InMemoryCrm;
    use assistline_security::AuditEvent;

    fn soon() -> Instant {
        Instant::now() + Duration::from_secs(1)
    }

    #[tokio::test]
    async fn logs_redacted_summary() {
        let crm = Arc::new(InMemoryCrm::new());
        let harness = Harness::new().with_adapter(MockAdapter::summary("Refill requested for [REDACTED_MRN]."));
        let id = harness.seed(&[("customer", "Refill for MRN: 12345678")]).await;

        let outcome = harness
            .orchestrator()
            .with_crm(crm.clone())
            .wrap_up(&id, "cust-9", soon())
            .await
            .unwrap();

        assert!(outcome.log.is_some());
        let logs = crm.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].customer_id, "cust-9");
        assert_eq!(logs[0].conversation_id, "conv-1");

        let writes: Vec<_> = harness
            .audit
            .entries()
            .into_iter()
            .filter(|e| matches!(e.event, AuditEvent::CrmWrite { success: true, .. }))
            .collect();
        assert_eq!(writes.len(), 1);
    }

    #[tokio::test]
    async fn skips_crm_without_summary() {
        let crm = Arc::new(InMemoryCrm::new());
        let harness = Harness::new()
            .with_adapter(MockAdapter::summary("x").failing(CapabilityFailure::Timeout));
        let id = harness.seed(&[("customer", "hi")]).await;

        let outcome = harness
            .orchestrator()
            .with_crm(crm.clone())
            .wrap_up(&id, "cust-9", soon())
            .await
            .unwrap();

        assert!(outcome.summary.is_none());
        assert!(crm.logs().is_empty());
    }

    #[tokio::test]
    async fn requires_crm() {
        let harness = Harness::new().with_adapter(MockAdapter::summary("x"));
        let id = harness.seed(&[("customer", "hi")]).await;

        let err = harness.orchestrator().wrap_up(&id, "cust-9", soon()).await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
