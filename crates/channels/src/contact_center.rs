//! Contact-center webhook events.
//!
//! Payloads carry their type in `topicName` or `eventType`:
//!
//! | event type                                     | effect                              |
//! |------------------------------------------------|-------------------------------------|
//! | `v2.conversations.start`                       | system message "Conversation started" |
//! | `v2.conversations.messages.created`            | agent/customer message appended     |
//! | `v2.conversations.participants.agent.joined`   | system message "Agent X joined ..." |
//! | `v2.conversations.end`                         | acknowledged, nothing removed       |
//! | anything else                                  | acknowledged as `ignored`           |
//!
//! Unrecognised types are reported as [`UNKNOWN_EVENT`]; the caller's string
//! is never echoed, logged or audited.

use std::sync::Arc;

use assistline_core::ledger::ConversationLedger;
use assistline_core::message::{ConversationId, Message, Role};
use assistline_security::AuditRecorder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::signature::SignatureVerifier;

pub const CONVERSATION_START: &str = "v2.conversations.start";
pub const MESSAGE_CREATED: &str = "v2.conversations.messages.created";
pub const AGENT_JOINED: &str = "v2.conversations.participants.agent.joined";
pub const CONVERSATION_END: &str = "v2.conversations.end";
pub const UNKNOWN_EVENT: &str = "unknown";

/// Why an inbound event was refused.
#[derive(Debug, thiserror::Error)]
pub enum InboundError {
    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("malformed event: {0}")]
    Malformed(String),

    #[error(transparent)]
    Ledger(#[from] assistline_core::Error),
}

/// A parsed contact-center event.
#[derive(Debug, Clone, PartialEq)]
pub enum ContactCenterEvent {
    Started {
        conversation_id: ConversationId,
    },
    MessageCreated {
        conversation_id: ConversationId,
        role: Role,
        text: String,
        timestamp: Option<DateTime<Utc>>,
    },
    AgentJoined {
        conversation_id: ConversationId,
        agent_name: String,
    },
    Ended {
        conversation_id: ConversationId,
    },
    Unknown,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "topicName")]
    topic_name: Option<String>,
    #[serde(rename = "eventType")]
    event_type: Option<String>,
}

#[derive(Deserialize)]
struct LifecycleBody {
    id: String,
}

#[derive(Deserialize)]
struct MessageBody {
    #[serde(rename = "conversationId")]
    conversation_id: String,
    message: MessagePayload,
}

#[derive(Deserialize)]
struct MessagePayload {
    #[serde(rename = "type", default)]
    sender_type: String,
    #[serde(default)]
    text: String,
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct AgentJoinedBody {
    #[serde(rename = "conversationId")]
    conversation_id: String,
    #[serde(default)]
    participant: Participant,
}

#[derive(Deserialize, Default)]
struct Participant {
    name: Option<String>,
}

impl ContactCenterEvent {
    /// Parse a raw webhook body.
    pub fn parse(body: &[u8]) -> Result<Self, InboundError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| InboundError::Malformed(e.to_string()))?;
        let envelope: Envelope = serde_json::from_value(value.clone())
            .map_err(|e| InboundError::Malformed(e.to_string()))?;
        let event_type = envelope
            .topic_name
            .or(envelope.event_type)
            .ok_or_else(|| InboundError::Malformed("missing topicName/eventType".into()))?;

        match event_type.as_str() {
            CONVERSATION_START => {
                let body: LifecycleBody = body_of(value)?;
                Ok(Self::Started {
                    conversation_id: conversation_id(&body.id)?,
                })
            }
            MESSAGE_CREATED => {
                let body: MessageBody = body_of(value)?;
                let role = if body.message.sender_type.eq_ignore_ascii_case("agent") {
                    Role::Agent
                } else {
                    Role::Customer
                };
                Ok(Self::MessageCreated {
                    conversation_id: conversation_id(&body.conversation_id)?,
                    role,
                    text: body.message.text,
                    timestamp: body.message.timestamp,
                })
            }
            AGENT_JOINED => {
                let body: AgentJoinedBody = body_of(value)?;
                Ok(Self::AgentJoined {
                    conversation_id: conversation_id(&body.conversation_id)?,
                    agent_name: body
                        .participant
                        .name
                        .filter(|n| !n.trim().is_empty())
                        .unwrap_or_else(|| "Agent".into()),
                })
            }
            CONVERSATION_END => {
                let body: LifecycleBody = body_of(value)?;
                Ok(Self::Ended {
                    conversation_id: conversation_id(&body.id)?,
                })
            }
            _ => Ok(Self::Unknown),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => CONVERSATION_START,
            Self::MessageCreated { .. } => MESSAGE_CREATED,
            Self::AgentJoined { .. } => AGENT_JOINED,
            Self::Ended { .. } => CONVERSATION_END,
            Self::Unknown => UNKNOWN_EVENT,
        }
    }

    pub fn conversation_id(&self) -> Option<&ConversationId> {
        match self {
            Self::Started { conversation_id }
            | Self::MessageCreated { conversation_id, .. }
            | Self::AgentJoined { conversation_id, .. }
            | Self::Ended { conversation_id } => Some(conversation_id),
            Self::Unknown => None,
        }
    }
}

fn body_of<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, InboundError> {
    serde_json::from_value(value).map_err(|e| InboundError::Malformed(e.to_string()))
}

fn conversation_id(raw: &str) -> Result<ConversationId, InboundError> {
    ConversationId::parse(raw).map_err(|e| InboundError::Malformed(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    Success,
    Ignored,
}

/// Response body returned to the contact center.
#[derive(Debug, Clone, Serialize)]
pub struct EventAck {
    pub status: AckStatus,
    pub event_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl EventAck {
    fn success(event: &ContactCenterEvent, action: &'static str) -> Self {
        Self {
            status: AckStatus::Success,
            event_type: event.event_type(),
            action: Some(action),
            conversation_id: event.conversation_id().cloned(),
            role: None,
            position: None,
        }
    }
}

/// Verifies, parses and applies contact-center events to the ledger.
pub struct ContactCenterHandler {
    ledger: Arc<dyn ConversationLedger>,
    audit: Arc<AuditRecorder>,
    verifier: SignatureVerifier,
}

impl ContactCenterHandler {
    pub fn new(ledger: Arc<dyn ConversationLedger>, audit: Arc<AuditRecorder>, verifier: SignatureVerifier) -> Self {
        Self { ledger, audit, verifier }
    }

    /// Handle one webhook delivery. `signature` is the raw header value.
    pub async fn handle(&self, body: &[u8], signature: Option<&str>) -> Result<EventAck, InboundError> {
        if !self.verifier.verify(body, signature) {
            warn!("Rejected contact-center event with invalid signature");
            return Err(InboundError::InvalidSignature);
        }

        let event = ContactCenterEvent::parse(body)?;
        let ack = self.apply(&event).await?;

        self.audit
            .record_inbound_event(event.conversation_id(), event.event_type());
        Ok(ack)
    }

    async fn apply(&self, event: &ContactCenterEvent) -> Result<EventAck, InboundError> {
        match event {
            ContactCenterEvent::Started { conversation_id } => {
                self.ledger
                    .append(conversation_id, Message::system("Conversation started"))
                    .await?;
                info!(conversation_id = %conversation_id, "Conversation started");
                Ok(EventAck::success(event, "registered"))
            }
            ContactCenterEvent::MessageCreated {
                conversation_id,
                role,
                text,
                timestamp,
            } => {
                let message = Message::new(*role, text.clone(), *timestamp)
                    .map_err(|e| InboundError::Malformed(e.to_string()))?;
                let receipt = self.ledger.append(conversation_id, message).await?;
                debug!(
                    conversation_id = %conversation_id,
                    role = %receipt.role,
                    position = receipt.position,
                    "Inbound message appended"
                );
                Ok(EventAck {
                    role: Some(receipt.role),
                    position: Some(receipt.position),
                    ..EventAck::success(event, "message_appended")
                })
            }
            ContactCenterEvent::AgentJoined {
                conversation_id,
                agent_name,
            } => {
                let notice = format!("Agent {agent_name} joined the conversation");
                self.ledger.append(conversation_id, Message::system(notice)).await?;
                Ok(EventAck::success(event, "agent_joined"))
            }
            ContactCenterEvent::Ended { conversation_id } => {
                info!(conversation_id = %conversation_id, "Conversation ended");
                Ok(EventAck::success(event, "ended"))
            }
            ContactCenterEvent::Unknown => {
                debug!("Ignoring unrecognised contact-center event");
                Ok(EventAck {
                    status: AckStatus::Ignored,
                    event_type: UNKNOWN_EVENT,
                    action: None,
                    conversation_id: None,
                    role: None,
                    position: None,
                })
            }
        }
    }
}
