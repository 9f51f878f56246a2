//! Thread-safe metrics engine fed by audit entries.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{PoisonError, RwLock};

use assistline_core::capability::CapabilityKind;
use assistline_security::{AuditEntry, AuditEvent, AuditSink};
use chrono::{DateTime, Utc};

use crate::model::*;

/// Assist latencies kept for percentile reporting.
const LATENCY_WINDOW: usize = 1_024;

/// The metrics engine.
///
/// Register it on the audit recorder with
/// `AuditRecorder::with_sink(engine.clone())`.
pub struct TelemetryEngine {
    started_at: DateTime<Utc>,
    totals: RwLock<RunningTotals>,
}

#[derive(Debug, Default)]
struct RunningTotals {
    assists: u64,
    complete: u64,
    partial: u64,
    empty: u64,
    elapsed_ms_sum: u64,
    recent_latency: VecDeque<u64>,
    capabilities: BTreeMap<CapabilityKind, CapabilityStats>,
    redaction: RedactionStats,
    inbound_events: BTreeMap<String, u64>,
    crm_writes: CrmWriteStats,
    intent_detections: u64,
}

impl TelemetryEngine {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            totals: RwLock::new(RunningTotals::default()),
        }
    }

    /// Fold one audit entry into the counters.
    pub fn observe(&self, entry: &AuditEntry) {
        let mut totals = self.totals.write().unwrap_or_else(PoisonError::into_inner);

        match &entry.event {
            AuditEvent::Orchestration {
                requested,
                succeeded,
                failed,
                elapsed_ms,
            } => {
                totals.assists += 1;
                totals.elapsed_ms_sum = totals.elapsed_ms_sum.saturating_add(*elapsed_ms);
                if totals.recent_latency.len() == LATENCY_WINDOW {
                    totals.recent_latency.pop_front();
                }
                totals.recent_latency.push_back(*elapsed_ms);

                if succeeded.is_empty() {
                    totals.empty += 1;
                } else if succeeded.len() == requested.len() {
                    totals.complete += 1;
                } else {
                    totals.partial += 1;
                }

                for kind in requested {
                    totals.capabilities.entry(*kind).or_default().requested += 1;
                }
                for kind in succeeded {
                    totals.capabilities.entry(*kind).or_default().succeeded += 1;
                }
                for failure in failed {
                    totals
                        .capabilities
                        .entry(failure.capability)
                        .or_default()
                        .record_failure(&failure.reason);
                }
            }
            AuditEvent::Redaction { counts } => {
                totals.redaction.windows += 1;
                for (category, count) in counts {
                    *totals.redaction.by_category.entry(category.clone()).or_default() += *count as u64;
                }
            }
            AuditEvent::InboundEvent { event_type } => {
                *totals.inbound_events.entry(event_type.clone()).or_default() += 1;
            }
            AuditEvent::CrmWrite { success, .. } => {
                if *success {
                    totals.crm_writes.succeeded += 1;
                } else {
                    totals.crm_writes.failed += 1;
                }
            }
            AuditEvent::IntentDetection { .. } => {
                totals.intent_detections += 1;
            }
        }
    }

    /// Real-time view of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let totals = self.totals.read().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();

        let samples: Vec<u64> = totals.recent_latency.iter().copied().collect();
        let avg_elapsed_ms = if totals.assists == 0 {
            0.0
        } else {
            totals.elapsed_ms_sum as f64 / totals.assists as f64
        };

        MetricsSnapshot {
            started_at: self.started_at,
            uptime_secs: (now - self.started_at).num_seconds(),
            assists: AssistStats {
                total: totals.assists,
                complete: totals.complete,
                partial: totals.partial,
                empty: totals.empty,
                avg_elapsed_ms,
                latency: LatencySummary::from_samples(&samples),
            },
            capabilities: totals.capabilities.clone(),
            redaction: totals.redaction.clone(),
            inbound_events: totals.inbound_events.clone(),
            crm_writes: totals.crm_writes.clone(),
            intent_detections: totals.intent_detections,
        }
    }
}

impl Default for TelemetryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for TelemetryEngine {
    fn record(&self, entry: &AuditEntry) {
        self.observe(entry);
    }
}
