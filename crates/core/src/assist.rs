//! The aggregate returned to the caller of an assist request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capability::CapabilityOutput;
use crate::message::ConversationId;

/// A candidate reply for the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartReply {
    pub text: String,
    /// In [0, 1].
    pub confidence: f32,
}

/// A knowledge snippet relevant to the customer's question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSnippet {
    pub snippet: String,
    /// In [0, 1].
    pub relevance_score: f32,
}

/// Best-effort assist output.
///
/// A `None` field means the capability was either not requested or did not
/// complete in time; the audit record tells the two apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistResult {
    pub conversation_id: ConversationId,
    pub timestamp: DateTime<Utc>,
    pub summary: Option<String>,
    pub smart_replies: Option<Vec<SmartReply>>,
    pub knowledge_snippets: Option<Vec<KnowledgeSnippet>>,
    pub next_best_action: Option<String>,
    /// Derived aggregate in [0, 1]; 0 when nothing scored completed.
    pub confidence_score: f32,
}

impl AssistResult {
    /// A result with every optional field absent.
    pub fn empty(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            timestamp: Utc::now(),
            summary: None,
            smart_replies: None,
            knowledge_snippets: None,
            next_best_action: None,
            confidence_score: 0.0,
        }
    }

    /// Place one capability's payload into its field.
    pub fn apply(&mut self, output: CapabilityOutput) {
        match output {
            CapabilityOutput::Summary(summary) => self.summary = Some(summary),
            CapabilityOutput::SmartReplies(replies) => self.smart_replies = Some(replies),
            CapabilityOutput::Knowledge(snippets) => self.knowledge_snippets = Some(snippets),
            CapabilityOutput::NextAction(action) => self.next_best_action = Some(action),
        }
    }

    /// Whether no capability contributed.
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.smart_replies.is_none()
            && self.knowledge_snippets.is_none()
            && self.next_best_action.is_none()
    }
}

/// How `confidence_score` is derived from the scored capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConfidenceAggregation {
    /// Unweighted mean over every reply confidence and snippet relevance.
    #[default]
    Mean,
    /// Mean of the per-capability means, weighted.
    Weighted { smart_replies: f32, knowledge: f32 },
}

impl ConfidenceAggregation {
    pub fn aggregate(&self, result: &AssistResult) -> f32 {
        let replies: Vec<f32> = result
            .smart_replies
            .iter()
            .flatten()
            .map(|r| r.confidence)
            .collect();
        let snippets: Vec<f32> = result
            .knowledge_snippets
            .iter()
            .flatten()
            .map(|k| k.relevance_score)
            .collect();

        let score = match *self {
            Self::Mean => mean(replies.iter().chain(snippets.iter()).copied()),
            Self::Weighted {
                smart_replies,
                knowledge,
            } => {
                let parts = [(replies, smart_replies), (snippets, knowledge)];
                let (sum, weight) = parts
                    .iter()
                    .filter(|(scores, w)| !scores.is_empty() && *w > 0.0)
                    .fold((0.0_f32, 0.0_f32), |(sum, weight), (scores, w)| {
                        (sum + mean(scores.iter().copied()) * w, weight + w)
                    });
                if weight > 0.0 { sum / weight } else { 0.0 }
            }
        };

        if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 }
    }
}

fn mean(scores: impl Iterator<Item = f32>) -> f32 {
    let (sum, count) = scores.fold((0.0_f32, 0usize), |(s, n), x| (s + x, n + 1));
    if count == 0 { 0.0 } else { sum / count as f32 }
}
