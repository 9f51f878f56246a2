//! Readiness probes for the registered capabilities and the CRM.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;

use assistline_core::capability::CapabilityKind;

use crate::AssistOrchestrator;

/// Reported readiness of one dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityHealth {
    Reachable,
    Unreachable,
    NotConfigured,
}

impl From<bool> for CapabilityHealth {
    fn from(reachable: bool) -> Self {
        if reachable { Self::Reachable } else { Self::Unreachable }
    }
}

/// Snapshot returned by [`AssistOrchestrator::health`].
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub capabilities: BTreeMap<CapabilityKind, CapabilityHealth>,
    pub crm: CapabilityHealth,
}

impl HealthReport {
    /// True when every configured dependency answered.
    pub fn all_reachable(&self) -> bool {
        self.capabilities
            .values()
            .chain(std::iter::once(&self.crm))
            .all(|h| *h != CapabilityHealth::Unreachable)
    }
}

impl AssistOrchestrator {
    /// Probe every capability concurrently. A probe that overruns `budget`
    /// counts as unreachable.
    pub async fn health(&self, budget: Duration) -> HealthReport {
        let mut capabilities: BTreeMap<CapabilityKind, CapabilityHealth> = CapabilityKind::ALL
            .into_iter()
            .map(|kind| (kind, CapabilityHealth::NotConfigured))
            .collect();

        let mut probes = JoinSet::new();
        for (kind, adapter) in &self.adapters {
            let (kind, adapter) = (*kind, adapter.clone());
            probes.spawn(async move {
                let reachable = tokio::time::timeout(budget, adapter.health_check())
                    .await
                    .unwrap_or(false);
                (kind, CapabilityHealth::from(reachable))
            });
        }

        let crm = match &self.crm {
            Some(crm) => {
                let probe = tokio::time::timeout(budget, crm.health_check()).await;
                CapabilityHealth::from(matches!(probe, Ok(Ok(true))))
            }
            None => CapabilityHealth::NotConfigured,
        };

        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((kind, health)) => {
                    capabilities.insert(kind, health);
                }
                Err(e) => tracing::warn!(error = %e, "Health probe panicked"),
            }
        }

        HealthReport { capabilities, crm }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{Harness, MockAdapter};

    #[tokio::test]
    async fn reports_each_capability() {
        let harness = Harness::new()
            .with_adapter(MockAdapter::summary("x"))
            .with_adapter(MockAdapter::knowledge(0.5).unhealthy());

        let report = harness.orchestrator().health(Duration::from_secs(1)).await;

        assert_eq!(report.capabilities[&CapabilityKind::Summary], CapabilityHealth::Reachable);
        assert_eq!(report.capabilities[&CapabilityKind::Knowledge], CapabilityHealth::Unreachable);
        assert_eq!(report.capabilities[&CapabilityKind::SmartReplies], CapabilityHealth::NotConfigured);
        assert_eq!(report.crm, CapabilityHealth::NotConfigured);
        assert!(!report.all_reachable());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_value(CapabilityHealth::NotConfigured).unwrap();
        assert_eq!(json, "not_configured");
    }
}
