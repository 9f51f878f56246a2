//! # assistline core
//!
//! Domain types, traits, and error definitions for the agent-assist engine.
//! This crate has **no framework dependencies**: it defines the domain model
//! that every other crate implements against.
//!
//! Every external collaborator and every stateful subsystem is a trait here.
//! Implementations live in their own crates, so the orchestrator can be
//! assembled from real backends in production and from test doubles in tests.

pub mod assist;
pub mod backend;
pub mod capability;
pub mod error;
pub mod ledger;
pub mod message;

// Re-export key types at crate root for ergonomics
pub use assist::{AssistResult, ConfidenceAggregation, KnowledgeSnippet, SmartReply};
pub use backend::{
    CaseRecord, ConversationLog, CrmProvider, CustomerRecord, Generation, GenerationRequest,
    IntentDetector, IntentMatch, LogRecord, NewCase, TextGenerator,
};
pub use capability::{
    CapabilityAdapter, CapabilityContext, CapabilityFailure, CapabilityKind, CapabilityOutput,
    CapabilitySet,
};
pub use error::{CrmError, Error, ProviderError, Result};
pub use ledger::{AppendReceipt, ConversationLedger, ConversationSummary, LedgerStats};
pub use message::{ConversationId, Message, Role};
