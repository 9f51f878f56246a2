//! HTTP handlers.
//!
//! - `GET  /health`                            dependency readiness
//! - `POST /v1/conversations/{id}/messages`    append one message
//! - `GET  /v1/conversations/{id}/messages`    redacted window
//! - `POST /v1/assist`                         run capabilities under a deadline
//! - `POST /v1/intent`                         classify one redacted utterance
//! - `POST /v1/conversations/{id}/wrap-up`     summarize and log to the CRM
//! - `GET  /v1/metrics`                        ledger and capability counters
//! - `POST /webhooks/contact-center`           signed inbound events

use std::collections::BTreeMap;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::info;

use assistline_channels::EventAck;
use assistline_core::assist::AssistResult;
use assistline_core::backend::IntentMatch;
use assistline_core::capability::{CapabilityKind, CapabilitySet};
use assistline_core::ledger::LedgerStats;
use assistline_core::error::{Error, ProviderError};
use assistline_core::message::{ConversationId, Message, Role};
use assistline_orchestrator::CapabilityHealth;
use assistline_telemetry::MetricsSnapshot;

use crate::error::ApiError;
use crate::state::SharedState;

/// Upper bound for each readiness probe behind `/health`.
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

type ApiResult<T> = Result<Json<T>, ApiError>;

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: i64,
    pub capabilities: BTreeMap<CapabilityKind, CapabilityHealth>,
    pub intent: CapabilityHealth,
    pub crm: CapabilityHealth,
}

#[derive(Deserialize)]
pub(crate) struct AppendRequest {
    role: String,
    text: String,
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub(crate) struct AppendResponse {
    pub status: String,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub position: usize,
}

#[derive(Deserialize)]
pub(crate) struct WindowQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
pub(crate) struct WindowResponse {
    pub conversation_id: ConversationId,
    pub redacted: bool,
    pub messages: Vec<Message>,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub(crate) struct AssistRequest {
    conversation_id: String,
    #[serde(default = "default_true")]
    include_summary: bool,
    #[serde(default = "default_true")]
    include_smart_replies: bool,
    #[serde(default = "default_true")]
    include_knowledge: bool,
    #[serde(default = "default_true")]
    include_next_action: bool,
    deadline_ms: Option<u64>,
}

#[derive(Deserialize)]
pub(crate) struct IntentRequest {
    session_id: String,
    text: String,
    language_code: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct WrapUpRequest {
    customer_id: String,
}

#[derive(Serialize)]
pub(crate) struct WrapUpResponse {
    pub conversation_id: ConversationId,
    pub log_id: Option<String>,
    pub summary: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct MetricsResponse {
    pub ledger: LedgerStats,
    pub audit_entries: usize,
    pub telemetry: MetricsSnapshot,
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub(crate) async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let report = state.orchestrator.health(HEALTH_PROBE_TIMEOUT).await;

    let intent = match &state.intent {
        Some(detector) => {
            let probe = tokio::time::timeout(HEALTH_PROBE_TIMEOUT, detector.health_check()).await;
            CapabilityHealth::from(matches!(probe, Ok(Ok(true))))
        }
        None => CapabilityHealth::NotConfigured,
    };

    let status = if report.all_reachable() && intent != CapabilityHealth::Unreachable {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_secs: (Utc::now() - state.start_time).num_seconds(),
        capabilities: report.capabilities,
        intent,
        crm: report.crm,
    })
}

pub(crate) async fn append_message(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<AppendRequest>, JsonRejection>,
) -> ApiResult<AppendResponse> {
    let Json(payload) = payload?;
    let conversation_id = ConversationId::parse(&id)?;
    let role: Role = payload.role.parse()?;
    let message = Message::new(role, payload.text, payload.timestamp)?;

    let receipt = state.ledger.append(&conversation_id, message).await?;

    Ok(Json(AppendResponse {
        status: "success".into(),
        conversation_id: receipt.conversation_id,
        role: receipt.role,
        position: receipt.position,
    }))
}

pub(crate) async fn list_messages(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    query: Result<Query<WindowQuery>, QueryRejection>,
) -> ApiResult<WindowResponse> {
    let Query(query) = query?;
    let conversation_id = ConversationId::parse(&id)?;
    let limit = query
        .limit
        .unwrap_or(state.config.assist.history_window)
        .max(1);

    let messages = state.orchestrator.redacted_window(&conversation_id, limit).await?;

    Ok(Json(WindowResponse {
        conversation_id,
        redacted: state.orchestrator.redaction_enabled(),
        messages,
    }))
}

pub(crate) async fn assist(
    State(state): State<SharedState>,
    payload: Result<Json<AssistRequest>, JsonRejection>,
) -> ApiResult<AssistResult> {
    let Json(payload) = payload?;
    let conversation_id = ConversationId::parse(&payload.conversation_id)?;

    let requested = CapabilitySet::from_flags(
        payload.include_summary,
        payload.include_smart_replies,
        payload.include_knowledge,
        payload.include_next_action,
    );
    if requested.is_empty() {
        return Err(ApiError::bad_request("At least one capability must be requested"));
    }
    if payload.deadline_ms == Some(0) {
        return Err(ApiError::bad_request("deadline_ms must be greater than 0"));
    }

    let budget_ms = state.config.assist.effective_deadline_ms(payload.deadline_ms);
    let result = state
        .orchestrator
        .get_assist_within(&conversation_id, &requested, Duration::from_millis(budget_ms))
        .await?;

    Ok(Json(result))
}

/// Classify one utterance. The text is redacted before it reaches the
/// intent engine; only the intent name and confidence are audited.
pub(crate) async fn detect_intent(
    State(state): State<SharedState>,
    payload: Result<Json<IntentRequest>, JsonRejection>,
) -> ApiResult<IntentMatch> {
    let Json(payload) = payload?;
    let session_id = ConversationId::parse(&payload.session_id)
        .map_err(|_| Error::validation("session_id", "must be 1-128 characters of [A-Za-z0-9._:-]"))?;
    if payload.text.trim().is_empty() {
        return Err(Error::validation("text", "must not be empty").into());
    }
    let Some(detector) = state.intent.clone() else {
        return Err(ApiError::service_unavailable("Intent detection is not configured"));
    };

    let text = if state.orchestrator.redaction_enabled() {
        let redacted = state.redactor.redact(&payload.text);
        state.audit.record_redaction(&session_id, &redacted.counts);
        redacted.redacted_text
    } else {
        payload.text
    };
    let language_code = payload
        .language_code
        .filter(|code| !code.trim().is_empty())
        .unwrap_or_else(|| state.config.intent.language_code.clone());

    let budget_ms = state.config.assist.effective_deadline_ms(None);
    let detected = tokio::time::timeout(
        Duration::from_millis(budget_ms),
        detector.detect_intent(session_id.as_str(), &text, &language_code),
    )
    .await
    .map_err(|_| ProviderError::Timeout(format!("no intent within {budget_ms}ms")))
    .and_then(|result| result)
    .map_err(Error::from)?;

    state
        .audit
        .record_intent_detection(&session_id, &detected.name, detected.confidence);
    info!(
        session_id = %session_id,
        intent = %detected.name,
        confidence = detected.confidence,
        "Intent detected"
    );
    Ok(Json(detected))
}

pub(crate) async fn wrap_up(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<WrapUpRequest>, JsonRejection>,
) -> ApiResult<WrapUpResponse> {
    let Json(payload) = payload?;
    let conversation_id = ConversationId::parse(&id)?;
    let customer_id = payload.customer_id.trim();
    if customer_id.is_empty() {
        return Err(ApiError::bad_request("Invalid customer_id: must not be empty"));
    }

    let budget = Duration::from_millis(state.config.assist.effective_deadline_ms(None));
    let outcome = state
        .orchestrator
        .wrap_up(&conversation_id, customer_id, Instant::now() + budget)
        .await?;

    Ok(Json(WrapUpResponse {
        conversation_id: outcome.conversation_id,
        log_id: outcome.log.map(|l| l.log_id),
        summary: outcome.summary,
    }))
}

pub(crate) async fn metrics(State(state): State<SharedState>) -> ApiResult<MetricsResponse> {
    Ok(Json(MetricsResponse {
        ledger: state.ledger.stats().await?,
        audit_entries: state.audit.count(),
        telemetry: state.telemetry.snapshot(),
    }))
}

pub(crate) async fn contact_center_webhook(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<EventAck> {
    let signature = headers
        .get(state.config.contact_center.signature_header.as_str())
        .and_then(|v| v.to_str().ok());

    let ack = state.inbound.handle(&body, signature).await?;
    info!(event_type = %ack.event_type, "Contact-center event accepted");
    Ok(Json(ack))
}
