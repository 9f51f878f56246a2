//! The fan-out/fan-in core.
//!
//! ```text
//!  ledger window ──► redact once ──► Arc<CapabilityContext>
//!                                        │
//!              ┌──────────────┬──────────┼──────────────┐
//!              ▼              ▼          ▼              ▼
//!          summary      smart_replies  knowledge    next_action
//!              └──────────────┴────┬─────┴──────────────┘
//!                                  ▼
//!                 join until done or deadline ──► AssistResult
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use assistline_core::assist::{AssistResult, ConfidenceAggregation};
use assistline_core::backend::CrmProvider;
use assistline_core::capability::{
    CapabilityAdapter, CapabilityContext, CapabilityFailure, CapabilityKind, CapabilityOutput,
    CapabilitySet,
};
use assistline_core::error::Result;
use assistline_core::ledger::ConversationLedger;
use assistline_core::message::{ConversationId, Message};
use assistline_security::{AuditRecorder, FailedCapability, Redactor};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default number of messages handed to the capabilities.
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

type Outcome = (CapabilityKind, std::result::Result<CapabilityOutput, CapabilityFailure>);

/// Aborts the wrapped task when dropped, so abandoning the outer join also
/// stops the adapter call.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Coordinates one assist request end to end.
///
/// Dependencies are injected at construction; nothing is global.
pub struct AssistOrchestrator {
    pub(crate) ledger: Arc<dyn ConversationLedger>,
    pub(crate) redactor: Arc<Redactor>,
    pub(crate) audit: Arc<AuditRecorder>,
    pub(crate) adapters: HashMap<CapabilityKind, Arc<dyn CapabilityAdapter>>,
    pub(crate) crm: Option<Arc<dyn CrmProvider>>,
    history_window: usize,
    redaction_enabled: bool,
    aggregation: ConfidenceAggregation,
}

impl AssistOrchestrator {
    pub fn new(
        ledger: Arc<dyn ConversationLedger>,
        redactor: Arc<Redactor>,
        audit: Arc<AuditRecorder>,
    ) -> Self {
        Self {
            ledger,
            redactor,
            audit,
            adapters: HashMap::new(),
            crm: None,
            history_window: DEFAULT_HISTORY_WINDOW,
            redaction_enabled: true,
            aggregation: ConfidenceAggregation::default(),
        }
    }

    /// Register an adapter, replacing any previous one of the same kind.
    pub fn with_adapter(mut self, adapter: Arc<dyn CapabilityAdapter>) -> Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    pub fn with_adapters(self, adapters: impl IntoIterator<Item = Arc<dyn CapabilityAdapter>>) -> Self {
        adapters.into_iter().fold(self, |o, a| o.with_adapter(a))
    }

    pub fn with_crm(mut self, crm: Arc<dyn CrmProvider>) -> Self {
        self.crm = Some(crm);
        self
    }

    pub fn with_history_window(mut self, history_window: usize) -> Self {
        self.history_window = history_window.max(1);
        self
    }

    pub fn with_redaction(mut self, enabled: bool) -> Self {
        self.redaction_enabled = enabled;
        self
    }

    pub fn with_confidence(mut self, aggregation: ConfidenceAggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn ledger(&self) -> &Arc<dyn ConversationLedger> {
        &self.ledger
    }

    pub fn audit(&self) -> &Arc<AuditRecorder> {
        &self.audit
    }

    pub fn redaction_enabled(&self) -> bool {
        self.redaction_enabled
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Registered capability kinds.
    pub fn registered(&self) -> CapabilitySet {
        self.adapters.keys().copied().collect()
    }

    /// Read a window and scrub it (when enabled), auditing the counts.
    pub async fn redacted_window(&self, conversation_id: &ConversationId, limit: usize) -> Result<Vec<Message>> {
        let window = self.ledger.window(conversation_id, limit).await?;
        if !self.redaction_enabled {
            return Ok(window);
        }
        let (messages, counts) = self.redactor.redact_messages(&window);
        self.audit.record_redaction(conversation_id, &counts);
        Ok(messages)
    }

    /// Run the requested capabilities against `conversation_id`, returning
    /// whatever completed by `deadline`.
    ///
    /// Fails only when the conversation is unknown (or the ledger itself
    /// fails). Capability failures and timeouts are omitted from the result
    /// and reported to the audit recorder.
    pub async fn get_assist(
        &self,
        conversation_id: &ConversationId,
        requested: &CapabilitySet,
        deadline: Instant,
    ) -> Result<AssistResult> {
        let started = Instant::now();
        let messages = self.redacted_window(conversation_id, self.history_window).await?;

        let context = Arc::new(CapabilityContext {
            conversation_id: conversation_id.clone(),
            messages,
            redacted: self.redaction_enabled,
        });

        let mut result = AssistResult::empty(conversation_id.clone());
        let mut succeeded: Vec<CapabilityKind> = Vec::new();
        let mut failed: Vec<FailedCapability> = Vec::new();
        let mut outstanding: BTreeSet<CapabilityKind> = BTreeSet::new();
        let mut tasks: JoinSet<Outcome> = JoinSet::new();

        for kind in requested.iter() {
            let Some(adapter) = self.adapters.get(&kind).cloned() else {
                failed.push(failure(kind, &CapabilityFailure::UpstreamError("no adapter registered".into())));
                continue;
            };
            let context = context.clone();
            outstanding.insert(kind);
            tasks.spawn(async move {
                let mut call = AbortOnDrop(tokio::spawn(async move { adapter.invoke(context, deadline).await }));
                let outcome = match (&mut call.0).await {
                    Ok(outcome) => outcome,
                    Err(e) if e.is_panic() => Err(CapabilityFailure::UpstreamError("adapter panicked".into())),
                    Err(_) => Err(CapabilityFailure::Timeout),
                };
                (kind, outcome)
            });
        }

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((kind, outcome)))) => {
                    outstanding.remove(&kind);
                    match outcome {
                        Ok(output) => {
                            debug!(conversation_id = %conversation_id, capability = %kind, "Capability completed");
                            succeeded.push(kind);
                            result.apply(output);
                        }
                        Err(reason) => {
                            debug!(
                                conversation_id = %conversation_id,
                                capability = %kind,
                                reason = reason.reason(),
                                "Capability failed"
                            );
                            failed.push(failure(kind, &reason));
                        }
                    }
                }
                // The wrapper task never panics; a join error here means it was aborted.
                Ok(Some(Err(e))) => warn!(error = %e, "Capability task ended unexpectedly"),
                Ok(None) => break,
                Err(_) => {
                    tasks.abort_all();
                    break;
                }
            }
        }

        for kind in outstanding {
            failed.push(failure(kind, &CapabilityFailure::Timeout));
        }
        failed.sort_by_key(|f| f.capability);

        result.confidence_score = self.aggregation.aggregate(&result);
        let elapsed = started.elapsed();

        info!(
            conversation_id = %conversation_id,
            requested = requested.len(),
            succeeded = succeeded.len(),
            failed = failed.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Assist completed"
        );

        self.audit.record_orchestration(
            conversation_id,
            requested.iter().collect(),
            succeeded,
            failed,
            elapsed,
        );

        Ok(result)
    }

    /// [`get_assist`](Self::get_assist) with a relative time budget.
    pub async fn get_assist_within(
        &self,
        conversation_id: &ConversationId,
        requested: &CapabilitySet,
        budget: Duration,
    ) -> Result<AssistResult> {
        self.get_assist(conversation_id, requested, Instant::now() + budget).await
    }
}

fn failure(capability: CapabilityKind, reason: &CapabilityFailure) -> FailedCapability {
    FailedCapability {
        capability,
        reason: reason.reason().to_string(),
    }
}
