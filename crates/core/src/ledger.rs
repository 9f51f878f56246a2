//! ConversationLedger trait: the owner of per-conversation message history.
//!
//! The ledger is append-only: messages are never edited or reordered, and a
//! conversation is created implicitly by its first append. Reads return a
//! point-in-time snapshot.
//!
//! Implementations: in-memory (`assistline-ledger`). Eviction is an external
//! lifecycle concern and is not part of this trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::{ConversationId, Message, Role};

/// Acknowledgement returned by a successful append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendReceipt {
    pub conversation_id: ConversationId,
    pub role: Role,
    /// 1-based position of the message in the conversation.
    pub position: usize,
    /// Whether this append created the conversation.
    pub created: bool,
}

/// Metadata about one conversation, without its content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

/// Aggregate counters derived from ledger state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub active_conversations: usize,
    pub total_messages: usize,
    pub avg_messages_per_conversation: f64,
}

impl LedgerStats {
    pub fn from_counts(active_conversations: usize, total_messages: usize) -> Self {
        let avg_messages_per_conversation = if active_conversations == 0 {
            0.0
        } else {
            total_messages as f64 / active_conversations as f64
        };
        Self {
            active_conversations,
            total_messages,
            avg_messages_per_conversation,
        }
    }
}

#[async_trait]
pub trait ConversationLedger: Send + Sync {
    /// The backend name (e.g. "in_memory").
    fn name(&self) -> &str;

    /// Append a message, creating the conversation on first use.
    ///
    /// Concurrent appends to the same id are serialized; appends to different
    /// ids do not contend with each other.
    async fn append(&self, conversation_id: &ConversationId, message: Message) -> Result<AppendReceipt>;

    /// The most recent `max_messages` messages in original order.
    ///
    /// Fails with `Error::NotFound` for an unknown id.
    async fn window(&self, conversation_id: &ConversationId, max_messages: usize) -> Result<Vec<Message>>;

    /// Whether the conversation exists. Never fails with NotFound.
    async fn exists(&self, conversation_id: &ConversationId) -> Result<bool>;

    /// Conversation metadata. Fails with `Error::NotFound` for an unknown id.
    async fn describe(&self, conversation_id: &ConversationId) -> Result<ConversationSummary>;

    async fn stats(&self) -> Result<LedgerStats>;
}
