//! Error types for the assistline domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; only [`Error`] crosses the
//! public API of the orchestrator and gateway.

use thiserror::Error;

/// The top-level error type for caller-visible operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced conversation does not exist.
    #[error("Conversation not found: {0}")]
    NotFound(String),

    /// Malformed inbound message or request.
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Backend transport failure surfaced outside the fan-out (e.g. CRM writes).
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("CRM error: {0}")]
    Crm(#[from] CrmError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unexpected failure inside the engine itself (e.g. a poisoned ledger lock).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a validation failure on a named field.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Transport-level failures of an external backend (text generator, intent engine).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Clone, Error)]
pub enum CrmError {
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("CRM request failed: {0}")]
    Request(String),

    #[error("Unknown CRM provider: {0}")]
    UnknownProvider(String),
}
