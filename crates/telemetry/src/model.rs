//! Snapshot types served by the metrics endpoint.

use std::collections::BTreeMap;

use assistline_core::capability::CapabilityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Capabilities ─────────────────────────────────────────────────────────

/// Outcome counters for one capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityStats {
    pub requested: u64,
    pub succeeded: u64,
    pub timeouts: u64,
    pub upstream_errors: u64,
    pub invalid_responses: u64,
}

impl CapabilityStats {
    pub fn failed(&self) -> u64 {
        self.timeouts + self.upstream_errors + self.invalid_responses
    }

    /// Fraction of requests that contributed a result; 0 when never requested.
    pub fn success_rate(&self) -> f64 {
        if self.requested == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.requested as f64
        }
    }

    pub(crate) fn record_failure(&mut self, reason: &str) {
        match reason {
            "timeout" => self.timeouts += 1,
            "invalid_response" => self.invalid_responses += 1,
            _ => self.upstream_errors += 1,
        }
    }
}

// ── Assists ──────────────────────────────────────────────────────────────

/// Latency over the most recent assists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    /// Number of samples the percentiles were computed from.
    pub samples: usize,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub max_ms: u64,
}

impl LatencySummary {
    /// Nearest-rank percentiles over `samples` (any order).
    pub fn from_samples(samples: &[u64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let mut sorted = samples.to_vec();
        sorted.sort_unstable();
        let rank = |p: f64| {
            let idx = ((p * sorted.len() as f64).ceil() as usize).clamp(1, sorted.len()) - 1;
            sorted[idx]
        };
        Self {
            samples: sorted.len(),
            p50_ms: rank(0.50),
            p95_ms: rank(0.95),
            max_ms: sorted[sorted.len() - 1],
        }
    }
}

/// Whole-request counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistStats {
    pub total: u64,
    /// Every requested capability contributed.
    pub complete: u64,
    /// Some, but not all, capabilities contributed.
    pub partial: u64,
    /// Nothing contributed.
    pub empty: u64,
    pub avg_elapsed_ms: f64,
    pub latency: LatencySummary,
}

// ── Redaction / CRM ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionStats {
    /// Windows scrubbed before leaving the trust boundary.
    pub windows: u64,
    /// Replacements per category, summed over all windows.
    pub by_category: BTreeMap<String, u64>,
}

impl RedactionStats {
    pub fn total_replacements(&self) -> u64 {
        self.by_category.values().sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmWriteStats {
    pub succeeded: u64,
    pub failed: u64,
}

// ── Snapshot ─────────────────────────────────────────────────────────────

/// Point-in-time view of every counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    pub assists: AssistStats,
    pub capabilities: BTreeMap<CapabilityKind, CapabilityStats>,
    pub redaction: RedactionStats,
    pub inbound_events: BTreeMap<String, u64>,
    pub crm_writes: CrmWriteStats,
    pub intent_detections: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_use_nearest_rank() {
        let samples: Vec<u64> = (1..=20).collect();
        let summary = LatencySummary::from_samples(&samples);
        assert_eq!(summary.samples, 20);
        assert_eq!(summary.p50_ms, 10);
        assert_eq!(summary.p95_ms, 19);
        assert_eq!(summary.max_ms, 20);
    }

    #[test]
    fn empty_samples() {
        assert_eq!(LatencySummary::from_samples(&[]), LatencySummary::default());
    }

    #[test]
    fn failure_reasons_are_bucketed() {
        let mut stats = CapabilityStats {
            requested: 4,
            succeeded: 1,
            ..Default::default()
        };
        stats.record_failure("timeout");
        stats.record_failure("invalid_response");
        stats.record_failure("upstream_error");
        assert_eq!(stats.failed(), 3);
        assert!((stats.success_rate() - 0.25).abs() < f64::EPSILON);
    }
}
