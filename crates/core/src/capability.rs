//! Capability adapters: the uniform seam around each analysis function.
//!
//! An adapter receives an already-redacted, read-only [`CapabilityContext`]
//! and a deadline, calls its backing capability, and translates the answer
//! into a [`CapabilityOutput`]. It never redacts and never aggregates.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;

use crate::assist::{KnowledgeSnippet, SmartReply};
use crate::error::ProviderError;
use crate::message::{ConversationId, Message, Role};

/// One independently invocable analysis function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Summary,
    SmartReplies,
    Knowledge,
    NextAction,
}

impl CapabilityKind {
    pub const ALL: [CapabilityKind; 4] = [
        CapabilityKind::Summary,
        CapabilityKind::SmartReplies,
        CapabilityKind::Knowledge,
        CapabilityKind::NextAction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::Summary => "summary",
            CapabilityKind::SmartReplies => "smart_replies",
            CapabilityKind::Knowledge => "knowledge",
            CapabilityKind::NextAction => "next_action",
        }
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of capabilities requested for one orchestration call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<CapabilityKind>);

impl CapabilitySet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        CapabilityKind::ALL.into_iter().collect()
    }

    /// Build a set from the four boolean request flags.
    pub fn from_flags(summary: bool, smart_replies: bool, knowledge: bool, next_action: bool) -> Self {
        let flags = [
            (CapabilityKind::Summary, summary),
            (CapabilityKind::SmartReplies, smart_replies),
            (CapabilityKind::Knowledge, knowledge),
            (CapabilityKind::NextAction, next_action),
        ];
        flags.into_iter().filter(|(_, on)| *on).map(|(kind, _)| kind).collect()
    }

    pub fn with(mut self, kind: CapabilityKind) -> Self {
        self.0.insert(kind);
        self
    }

    pub fn contains(&self, kind: CapabilityKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = CapabilityKind> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<CapabilityKind> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = CapabilityKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The sanitized conversation view shared by every adapter in one call.
///
/// Built once per orchestration and handed out behind an `Arc`, so adapters
/// only ever see it by shared reference.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityContext {
    pub conversation_id: ConversationId,
    /// The redacted window, oldest first.
    pub messages: Vec<Message>,
    /// Whether redaction ran over `messages`.
    pub redacted: bool,
}

impl CapabilityContext {
    /// Text of the most recent customer message, if any.
    pub fn last_customer_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Customer)
            .map(|m| m.text.as_str())
    }

    /// The last customer message, falling back to the last message of any role.
    pub fn focus_text(&self) -> Option<&str> {
        self.last_customer_text()
            .or_else(|| self.messages.last().map(|m| m.text.as_str()))
    }

    /// `ROLE: text` lines for prompt building.
    pub fn transcript(&self) -> String {
        transcript(&self.messages)
    }
}

/// Format messages as `ROLE: text` lines.
pub fn transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str().to_uppercase(), m.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Successful payload of one capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "capability", content = "payload", rename_all = "snake_case")]
pub enum CapabilityOutput {
    Summary(String),
    SmartReplies(Vec<SmartReply>),
    Knowledge(Vec<KnowledgeSnippet>),
    NextAction(String),
}

impl CapabilityOutput {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            CapabilityOutput::Summary(_) => CapabilityKind::Summary,
            CapabilityOutput::SmartReplies(_) => CapabilityKind::SmartReplies,
            CapabilityOutput::Knowledge(_) => CapabilityKind::Knowledge,
            CapabilityOutput::NextAction(_) => CapabilityKind::NextAction,
        }
    }
}

/// Why a capability produced no result. Recovered by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityFailure {
    #[error("capability did not complete before the deadline")]
    Timeout,

    #[error("upstream error: {0}")]
    UpstreamError(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl CapabilityFailure {
    /// Short reason code for the audit channel.
    pub fn reason(&self) -> &'static str {
        match self {
            CapabilityFailure::Timeout => "timeout",
            CapabilityFailure::UpstreamError(_) => "upstream_error",
            CapabilityFailure::InvalidResponse(_) => "invalid_response",
        }
    }
}

impl From<ProviderError> for CapabilityFailure {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout(_) => CapabilityFailure::Timeout,
            ProviderError::InvalidResponse(msg) => CapabilityFailure::InvalidResponse(msg),
            other => CapabilityFailure::UpstreamError(other.to_string()),
        }
    }
}

/// Run a backend call, abandoning it once `deadline` passes.
pub async fn within_deadline<T, F>(deadline: Instant, call: F) -> Result<T, CapabilityFailure>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout_at(deadline, call).await {
        Ok(result) => result.map_err(CapabilityFailure::from),
        Err(_) => Err(CapabilityFailure::Timeout),
    }
}

/// The core adapter trait.
#[async_trait]
pub trait CapabilityAdapter: Send + Sync {
    /// Which capability this adapter provides.
    fn kind(&self) -> CapabilityKind;

    /// Name of the backing provider (for health and audit output).
    fn provider(&self) -> &str;

    /// Compute the capability over `context`, returning no later than `deadline`.
    async fn invoke(
        &self,
        context: Arc<CapabilityContext>,
        deadline: Instant,
    ) -> Result<CapabilityOutput, CapabilityFailure>;

    /// Readiness of the backing capability, without running an analysis.
    async fn health_check(&self) -> bool {
        true
    }
}
