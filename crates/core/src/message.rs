//! Message and conversation identity types.
//!
//! A conversation is the ordered exchange between a customer and a human
//! agent: contact center pushes a message → ledger appends it → orchestrator
//! reads a window of it on demand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Longest accepted conversation id.
pub const MAX_CONVERSATION_ID_LEN: usize = 128;

/// Externally assigned, unique identifier of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Parse and validate an id supplied by a caller.
    ///
    /// Ids must be non-empty, at most [`MAX_CONVERSATION_ID_LEN`] characters,
    /// and consist of ASCII letters, digits, `.`, `_`, `:` or `-`.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("conversation_id", "must not be empty"));
        }
        if trimmed.len() > MAX_CONVERSATION_ID_LEN {
            return Err(Error::validation(
                "conversation_id",
                format!("longer than {MAX_CONVERSATION_ID_LEN} characters"),
            ));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-')))
        {
            return Err(Error::validation(
                "conversation_id",
                format!("contains invalid character {bad:?}"),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person contacting support
    Customer,
    /// The human support agent
    Agent,
    /// Platform notices (agent joined, conversation started)
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Agent => "agent",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    /// Case-insensitive; `patient` and `user` are aliases of `customer`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" | "patient" | "user" => Ok(Role::Customer),
            "agent" => Ok(Role::Agent),
            "system" => Ok(Role::System),
            other => Err(Error::validation("role", format!("unknown role '{other}'"))),
        }
    }
}

/// A single message in a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a validated message; `timestamp` defaults to now.
    pub fn new(role: Role, text: impl Into<String>, timestamp: Option<DateTime<Utc>>) -> Result<Self, Error> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::validation("text", "must not be empty"));
        }
        Ok(Self {
            role,
            text,
            timestamp: timestamp.unwrap_or_else(Utc::now),
        })
    }

    pub fn customer(text: impl Into<String>) -> Self {
        Self::unchecked(Role::Customer, text)
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::unchecked(Role::Agent, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::unchecked(Role::System, text)
    }

    fn unchecked(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_conversation_id() {
        let id = ConversationId::parse("  conv-123:abc ").unwrap();
        assert_eq!(id.as_str(), "conv-123:abc");
    }

    #[test]
    fn reject_bad_conversation_ids() {
        assert!(ConversationId::parse("").is_err());
        assert!(ConversationId::parse("has space").is_err());
        assert!(ConversationId::parse(&"x".repeat(129)).is_err());
    }

    #[test]
    fn role_aliases() {
        assert_eq!("Patient".parse::<Role>().unwrap(), Role::Customer);
        assert_eq!("USER".parse::<Role>().unwrap(), Role::Customer);
        assert_eq!("agent".parse::<Role>().unwrap(), Role::Agent);
        assert!("robot".parse::<Role>().is_err());
    }

    #[test]
    fn empty_text_rejected() {
        let err = Message::new(Role::Customer, "   ", None).unwrap_err();
        assert!(err.to_string().contains("text"));
    }

    #[test]
    fn role_serializes_lowercase() {
        let msg = Message::agent("How can I help?");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"agent\""));
    }
}
