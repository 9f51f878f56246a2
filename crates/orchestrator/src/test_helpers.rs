use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assistline_core::assist::{KnowledgeSnippet, SmartReply};
use assistline_core::capability::{
    CapabilityAdapter, CapabilityContext, CapabilityFailure, CapabilityKind, CapabilityOutput,
};
use assistline_core::ledger::ConversationLedger;
use assistline_core::message::{ConversationId, Message, Role};
use assistline_ledger::InMemoryLedger;
use assistline_security::{AuditEvent, AuditRecorder, Redactor};
use async_trait::async_trait;
use tokio::time::Instant;

use crate::AssistOrchestrator;

#[derive(Clone)]
enum Behavior {
    Succeed,
    Fail(CapabilityFailure),
    Hang,
    Delay(Duration),
    Panic,
}

/// Scripted adapter that records what it was shown.
pub(crate) struct MockAdapter {
    kind: CapabilityKind,
    output: CapabilityOutput,
    behavior: Behavior,
    healthy: bool,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl MockAdapter {
    fn new(output: CapabilityOutput) -> Self {
        Self {
            kind: output.kind(),
            output,
            behavior: Behavior::Succeed,
            healthy: true,
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn summary(text: &str) -> Self {
        Self::new(CapabilityOutput::Summary(text.into()))
    }

    pub fn replies(scores: &[f32]) -> Self {
        Self::new(CapabilityOutput::SmartReplies(
            scores
                .iter()
                .enumerate()
                .map(|(i, s)| SmartReply {
                    text: format!("reply {i}"),
                    confidence: *s,
                })
                .collect(),
        ))
    }

    pub fn knowledge(score: f32) -> Self {
        Self::new(CapabilityOutput::Knowledge(vec![KnowledgeSnippet {
            snippet: "Refills need a current prescription.".into(),
            relevance_score: score,
        }]))
    }

    pub fn next_action(text: &str) -> Self {
        Self::new(CapabilityOutput::NextAction(text.into()))
    }

    pub fn failing(mut self, failure: CapabilityFailure) -> Self {
        self.behavior = Behavior::Fail(failure);
        self
    }

    pub fn hanging(mut self) -> Self {
        self.behavior = Behavior::Hang;
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.behavior = Behavior::Delay(delay);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.behavior = Behavior::Panic;
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    pub fn seen(&self) -> Arc<Mutex<Vec<String>>> {
        self.seen.clone()
    }
}

#[async_trait]
impl CapabilityAdapter for MockAdapter {
    fn kind(&self) -> CapabilityKind {
        self.kind
    }

    fn provider(&self) -> &str {
        "mock"
    }

    async fn invoke(
        &self,
        context: Arc<CapabilityContext>,
        _deadline: Instant,
    ) -> Result<CapabilityOutput, CapabilityFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .extend(context.messages.iter().map(|m| m.text.clone()));

        match self.behavior.clone() {
            Behavior::Succeed => Ok(self.output.clone()),
            Behavior::Fail(failure) => Err(failure),
            Behavior::Hang => std::future::pending().await,
            Behavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(self.output.clone())
            }
            Behavior::Panic => panic!("mock adapter panic"),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }
}

/// Ledger, audit and adapters wired the way the gateway wires them.
pub(crate) struct Harness {
    pub ledger: Arc<InMemoryLedger>,
    pub audit: Arc<AuditRecorder>,
    adapters: Vec<Arc<dyn CapabilityAdapter>>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            ledger: Arc::new(InMemoryLedger::new()),
            audit: Arc::new(AuditRecorder::new()),
            adapters: Vec::new(),
        }
    }

    pub fn with_adapter(mut self, adapter: MockAdapter) -> Self {
        self.adapters.push(Arc::new(adapter));
        self
    }

    pub fn orchestrator(&self) -> AssistOrchestrator {
        AssistOrchestrator::new(
            self.ledger.clone(),
            Arc::new(Redactor::builtin().unwrap()),
            self.audit.clone(),
        )
        .with_adapters(self.adapters.iter().cloned())
    }

    pub async fn seed(&self, messages: &[(&str, &str)]) -> ConversationId {
        let id = ConversationId::parse("conv-1").unwrap();
        for (role, text) in messages {
            let role: Role = role.parse().unwrap();
            self.ledger
                .append(&id, Message::new(role, *text, None).unwrap())
                .await
                .unwrap();
        }
        id
    }

    /// Succeeded kinds and `(kind, reason)` failures from the newest orchestration entry.
    pub fn last_orchestration(&self) -> (Vec<CapabilityKind>, Vec<(CapabilityKind, String)>) {
        self.audit
            .entries()
            .into_iter()
            .rev()
            .find_map(|entry| match entry.event {
                AuditEvent::Orchestration { succeeded, failed, .. } => Some((
                    succeeded,
                    failed.into_iter().map(|f| (f.capability, f.reason)).collect(),
                )),
                _ => None,
            })
            .expect("no orchestration entry recorded")
    }
}
