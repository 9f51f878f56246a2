//! Operational metrics for assistline.
//!
//! The [`TelemetryEngine`] is an [`AuditSink`](assistline_security::AuditSink):
//! plugged into the audit recorder, it folds every entry into running
//! counters (per-capability outcomes, assist latency, redaction volume,
//! inbound events, CRM writes) and serves them as a [`MetricsSnapshot`].
//! Only counts are kept. No message text ever reaches this crate.

pub mod engine;
pub mod model;

pub use engine::TelemetryEngine;
pub use model::{AssistStats, CapabilityStats, CrmWriteStats, LatencySummary, MetricsSnapshot, RedactionStats};
