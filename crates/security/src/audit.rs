//! Audit recording: compliance and operational side channel.
//!
//! Entries carry identifiers, category counts, and capability names and
//! outcomes only. Message text never reaches this module.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use assistline_core::{CapabilityKind, ConversationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default ring capacity.
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

/// A single audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub conversation_id: Option<ConversationId>,
    pub event: AuditEvent,
}

/// A capability that did not contribute, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedCapability {
    pub capability: CapabilityKind,
    /// `timeout`, `upstream_error` or `invalid_response`
    pub reason: String,
}

/// Auditable events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A window was scrubbed before leaving the trust boundary.
    Redaction { counts: BTreeMap<String, usize> },
    /// One assist fan-out finished.
    Orchestration {
        requested: Vec<CapabilityKind>,
        succeeded: Vec<CapabilityKind>,
        failed: Vec<FailedCapability>,
        elapsed_ms: u64,
    },
    /// A contact-center event was accepted.
    InboundEvent { event_type: String },
    /// A write was sent to the CRM.
    CrmWrite { operation: String, success: bool },
    /// An utterance was classified by the intent engine.
    IntentDetection { intent: String, confidence: f32 },
}

/// Where audit entries are forwarded.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Write-only audit recorder with a bounded in-memory ring.
///
/// The oldest entries are dropped once `capacity` is reached. Sinks see
/// every entry regardless.
pub struct AuditRecorder {
    enabled: bool,
    capacity: usize,
    entries: Mutex<VecDeque<AuditEntry>>,
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecorder")
            .field("enabled", &self.enabled)
            .field("capacity", &self.capacity)
            .field("entry_count", &self.count())
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for AuditRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditRecorder {
    /// Create a recorder with no sinks and the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            enabled: true,
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
            sinks: Vec::new(),
        }
    }

    /// A recorder that drops everything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::with_capacity(1)
        }
    }

    /// Add a sink.
    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn from_config(config: &assistline_config::AuditConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        let recorder = Self::with_capacity(config.capacity);
        if config.tracing_sink {
            recorder.with_sink(Arc::new(TracingSink))
        } else {
            recorder
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record_redaction(&self, conversation_id: &ConversationId, counts: &BTreeMap<String, usize>) {
        self.log(
            Some(conversation_id),
            AuditEvent::Redaction {
                counts: counts.clone(),
            },
        );
    }

    pub fn record_orchestration(
        &self,
        conversation_id: &ConversationId,
        requested: Vec<CapabilityKind>,
        succeeded: Vec<CapabilityKind>,
        failed: Vec<FailedCapability>,
        elapsed: Duration,
    ) {
        self.log(
            Some(conversation_id),
            AuditEvent::Orchestration {
                requested,
                succeeded,
                failed,
                elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            },
        );
    }

    pub fn record_inbound_event(&self, conversation_id: Option<&ConversationId>, event_type: &str) {
        self.log(
            conversation_id,
            AuditEvent::InboundEvent {
                event_type: event_type.into(),
            },
        );
    }

    pub fn record_crm_write(&self, conversation_id: &ConversationId, operation: &str, success: bool) {
        self.log(
            Some(conversation_id),
            AuditEvent::CrmWrite {
                operation: operation.into(),
                success,
            },
        );
    }

    /// Only the intent name and confidence are kept; the utterance is not.
    pub fn record_intent_detection(&self, session_id: &ConversationId, intent: &str, confidence: f32) {
        self.log(
            Some(session_id),
            AuditEvent::IntentDetection {
                intent: intent.into(),
                confidence,
            },
        );
    }

    fn log(&self, conversation_id: Option<&ConversationId>, event: AuditEvent) {
        if !self.enabled {
            return;
        }

        let entry = AuditEntry {
            timestamp: Utc::now(),
            conversation_id: conversation_id.cloned(),
            event,
        };

        {
            // A panicking sink elsewhere must not stop recording.
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if entries.len() == self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }

        for sink in &self.sinks {
            sink.record(&entry);
        }
    }

    /// Snapshot of retained entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Count of retained entries.
    pub fn count(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// A tracing-based audit sink that logs entries via `tracing::info!`.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        let conversation_id = entry
            .conversation_id
            .as_ref()
            .map(ConversationId::as_str)
            .unwrap_or("-");
        tracing::info!(
            conversation_id,
            event = ?entry.event,
            "AUDIT"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(raw: &str) -> ConversationId {
        ConversationId::parse(raw).unwrap()
    }

    #[test]
    fn record_and_retrieve_entries() {
        let recorder = AuditRecorder::new();
        let mut counts = BTreeMap::new();
        counts.insert("ssn".to_string(), 1);
        recorder.record_redaction(&cid("c1"), &counts);
        recorder.record_orchestration(
            &cid("c1"),
            vec![CapabilityKind::Summary, CapabilityKind::Knowledge],
            vec![CapabilityKind::Summary],
            vec![FailedCapability {
                capability: CapabilityKind::Knowledge,
                reason: "timeout".into(),
            }],
            Duration::from_millis(120),
        );

        assert_eq!(recorder.count(), 2);
        let entries = recorder.entries();
        assert_eq!(entries[0].conversation_id, Some(cid("c1")));
        assert!(matches!(entries[0].event, AuditEvent::Redaction { .. }));
        match &entries[1].event {
            AuditEvent::Orchestration {
                failed, elapsed_ms, ..
            } => {
                assert_eq!(failed[0].reason, "timeout");
                assert_eq!(*elapsed_ms, 120);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn ring_drops_oldest() {
        let recorder = AuditRecorder::with_capacity(2);
        recorder.record_inbound_event(None, "v2.conversations.start");
        recorder.record_inbound_event(None, "v2.conversations.messages.created");
        recorder.record_inbound_event(None, "v2.conversations.end");

        let entries = recorder.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].event,
            AuditEvent::InboundEvent {
                event_type: "v2.conversations.messages.created".into()
            }
        );
    }

    #[test]
    fn disabled_recorder_keeps_nothing() {
        let recorder = AuditRecorder::disabled();
        recorder.record_crm_write(&cid("c1"), "log_conversation", true);
        assert_eq!(recorder.count(), 0);
        assert!(!recorder.is_enabled());
    }

    #[test]
    fn entry_serialization_is_tagged() {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            conversation_id: Some(cid("c9")),
            event: AuditEvent::CrmWrite {
                operation: "log_conversation".into(),
                success: true,
            },
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["type"], "crm_write");
        assert_eq!(json["conversation_id"], "c9");
    }

    #[test]
    fn intent_detection_keeps_name_and_confidence_only() {
        let recorder = AuditRecorder::new();
        recorder.record_intent_detection(&cid("session-7"), "prescription_refill", 0.82);

        let json = serde_json::to_value(recorder.entries()).unwrap();
        let event = &json[0]["event"];
        assert_eq!(event["type"], "intent_detection");
        assert_eq!(event["intent"], "prescription_refill");
        assert_eq!(event.as_object().unwrap().len(), 3);
        assert_eq!(json[0]["conversation_id"], "session-7");
    }

    #[test]
    fn custom_sink_receives_events() {
        struct TestSink {
            received: Mutex<Vec<String>>,
        }

        impl AuditSink for TestSink {
            fn record(&self, entry: &AuditEntry) {
                if let AuditEvent::InboundEvent { event_type } = &entry.event {
                    self.received.lock().unwrap().push(event_type.clone());
                }
            }
        }

        let sink = Arc::new(TestSink {
            received: Mutex::new(Vec::new()),
        });
        let recorder = AuditRecorder::with_capacity(1).with_sink(sink.clone());
        recorder.record_inbound_event(Some(&cid("c1")), "v2.conversations.start");
        recorder.record_inbound_event(Some(&cid("c1")), "v2.conversations.end");

        // The ring keeps one, the sink sees both.
        assert_eq!(recorder.count(), 1);
        assert_eq!(sink.received.lock().unwrap().len(), 2);
    }

    #[test]
    fn from_config_respects_flags() {
        let config = assistline_config::AuditConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(!AuditRecorder::from_config(&config).is_enabled());

        let recorder = AuditRecorder::from_config(&assistline_config::AuditConfig::default());
        assert!(recorder.is_enabled());
        let debug = format!("{recorder:?}");
        assert!(debug.contains("sink_count: 1"));
    }
}
