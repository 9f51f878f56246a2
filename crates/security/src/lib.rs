//! Trust-boundary module for assistline: redaction and audit recording.
//!
//! Provides:
//! - **Redaction**: deterministic PII/PHI scrubbing with per-category counts
//! - **Audit recording**: counts-and-outcomes compliance log with pluggable sinks

pub mod audit;
pub mod redaction;

pub use audit::{
    AuditEntry, AuditEvent, AuditRecorder, AuditSink, DEFAULT_AUDIT_CAPACITY, FailedCapability,
    TracingSink,
};
pub use redaction::{
    BUILTIN_CATEGORIES, CustomCategory, RedactionError, RedactionResult, Redactor,
};
