//! In-memory ledger: the process-owned store of live conversations.
//!
//! The map lock is held only to find or insert a conversation; each
//! conversation then has its own mutex, so writers to one id are serialized
//! while unrelated conversations proceed independently. No lock is held
//! across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use assistline_core::error::{Error, Result};
use assistline_core::ledger::{AppendReceipt, ConversationLedger, ConversationSummary, LedgerStats};
use assistline_core::message::{ConversationId, Message};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

struct ConversationState {
    messages: Vec<Message>,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

type Slot = Arc<Mutex<ConversationState>>;

/// A ledger that keeps every conversation in process memory.
/// Nothing is ever evicted by the ledger itself.
#[derive(Default)]
pub struct InMemoryLedger {
    conversations: RwLock<HashMap<ConversationId, Slot>>,
}

fn poisoned(what: &str) -> Error {
    Error::Internal(format!("ledger {what} lock poisoned"))
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, conversation_id: &ConversationId) -> Result<Option<Slot>> {
        let map = self.conversations.read().map_err(|_| poisoned("map"))?;
        Ok(map.get(conversation_id).cloned())
    }

    fn require(&self, conversation_id: &ConversationId) -> Result<Slot> {
        self.slot(conversation_id)?
            .ok_or_else(|| Error::NotFound(conversation_id.to_string()))
    }

    /// Find the conversation or create it. Returns whether it was created.
    fn slot_or_create(&self, conversation_id: &ConversationId, now: DateTime<Utc>) -> Result<(Slot, bool)> {
        if let Some(slot) = self.slot(conversation_id)? {
            return Ok((slot, false));
        }

        let mut map = self.conversations.write().map_err(|_| poisoned("map"))?;
        // Another writer may have inserted it between the two locks.
        if let Some(slot) = map.get(conversation_id) {
            return Ok((slot.clone(), false));
        }
        let slot = Arc::new(Mutex::new(ConversationState {
            messages: Vec::new(),
            created_at: now,
            last_activity_at: now,
        }));
        map.insert(conversation_id.clone(), slot.clone());
        Ok((slot, true))
    }
}

#[async_trait]
impl ConversationLedger for InMemoryLedger {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append(&self, conversation_id: &ConversationId, message: Message) -> Result<AppendReceipt> {
        let now = Utc::now();
        let role = message.role;
        let (slot, created) = self.slot_or_create(conversation_id, now)?;

        let position = {
            let mut state = slot.lock().map_err(|_| poisoned("conversation"))?;
            state.messages.push(message);
            state.last_activity_at = now;
            state.messages.len()
        };

        tracing::debug!(
            conversation_id = %conversation_id,
            role = %role,
            position,
            created,
            "Message appended"
        );

        Ok(AppendReceipt {
            conversation_id: conversation_id.clone(),
            role,
            position,
            created,
        })
    }

    async fn window(&self, conversation_id: &ConversationId, max_messages: usize) -> Result<Vec<Message>> {
        let slot = self.require(conversation_id)?;
        let state = slot.lock().map_err(|_| poisoned("conversation"))?;
        let start = state.messages.len().saturating_sub(max_messages);
        Ok(state.messages[start..].to_vec())
    }

    async fn exists(&self, conversation_id: &ConversationId) -> Result<bool> {
        Ok(self.slot(conversation_id)?.is_some())
    }

    async fn describe(&self, conversation_id: &ConversationId) -> Result<ConversationSummary> {
        let slot = self.require(conversation_id)?;
        let state = slot.lock().map_err(|_| poisoned("conversation"))?;
        Ok(ConversationSummary {
            conversation_id: conversation_id.clone(),
            message_count: state.messages.len(),
            created_at: state.created_at,
            last_activity_at: state.last_activity_at,
        })
    }

    async fn stats(&self) -> Result<LedgerStats> {
        let slots: Vec<Slot> = {
            let map = self.conversations.read().map_err(|_| poisoned("map"))?;
            map.values().cloned().collect()
        };

        let mut total_messages = 0;
        for slot in &slots {
            total_messages += slot.lock().map_err(|_| poisoned("conversation"))?.messages.len();
        }

        Ok(LedgerStats::from_counts(slots.len(), total_messages))
    }
}
