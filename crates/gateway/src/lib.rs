//! HTTP API gateway for assistline.
//!
//! Exposes the ledger, the assist orchestrator, CRM wrap-up, metrics and
//! the contact-center webhook over REST. Built on Axum.

pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use error::ApiError;
pub use state::{AppState, SharedState};

/// Build the router with every route and the security layers:
/// - request body size limit (`gateway.body_limit_bytes`)
/// - CORS restricted to `gateway.cors_origins` (none by default)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.config.gateway.body_limit_bytes;
    let cors = cors_layer(&state.config.gateway.cors_origins);

    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/v1/conversations/{id}/messages",
            post(routes::append_message).get(routes::list_messages),
        )
        .route("/v1/conversations/{id}/wrap-up", post(routes::wrap_up))
        .route("/v1/assist", post(routes::assist))
        .route("/v1/intent", post(routes::detect_intent))
        .route("/v1/metrics", get(routes::metrics))
        .route("/webhooks/contact-center", post(routes::contact_center_webhook))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server and serve until Ctrl-C.
pub async fn start(config: assistline_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(AppState::from_config(config)?);

    let registered = state.orchestrator.registered();
    let capabilities: Vec<&str> = registered.iter().map(|k| k.as_str()).collect();
    info!(
        addr = %addr,
        capabilities = %capabilities.join(","),
        redaction = state.orchestrator.redaction_enabled(),
        "Gateway starting"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assistline_channels::SignatureVerifier;
    use assistline_config::AppConfig;
    use assistline_providers::{ProviderRegistry, StaticGenerator};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const STATIC_REPLY: &str = r#"["I can help with that refill.", "Let me check your prescription."]"#;

    fn test_state_with(config: AppConfig) -> SharedState {
        let registry =
            ProviderRegistry::offline().with_generator(Arc::new(StaticGenerator::new(STATIC_REPLY, 0.8)));
        Arc::new(AppState::assemble(config, registry).unwrap())
    }

    fn test_state() -> SharedState {
        test_state_with(AppConfig::default())
    }

    async fn send(state: &SharedState, req: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state.clone()).oneshot(req).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn seed(state: &SharedState, id: &str, messages: &[(&str, &str)]) {
        for (role, text) in messages {
            let (status, _) = send(
                state,
                post_json(
                    &format!("/v1/conversations/{id}/messages"),
                    json!({"role": role, "text": text}),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn health_endpoint() {
        let state = test_state();
        let (status, json) = send(&state, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["capabilities"]["summary"], "reachable");
        assert_eq!(json["capabilities"]["next_action"], "reachable");
        assert_eq!(json["intent"], "not_configured");
        assert_eq!(json["crm"], "reachable");
        assert!(json["uptime_secs"].as_i64().unwrap() >= 0);
    }

    #[tokio::test]
    async fn append_returns_position() {
        let state = test_state();
        let (status, json) = send(
            &state,
            post_json("/v1/conversations/c1/messages", json!({"role": "Patient", "text": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["role"], "customer");
        assert_eq!(json["position"], 1);
    }

    #[tokio::test]
    async fn append_validation_errors_are_400() {
        let state = test_state();
        let (status, json) = send(
            &state,
            post_json("/v1/conversations/c1/messages", json!({"role": "bot", "text": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("role"));

        let (status, _) = send(
            &state,
            post_json("/v1/conversations/c1/messages", json!({"role": "agent", "text": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = send(&state, post_json("/v1/conversations/c1/messages", json!({"role": "agent"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn window_is_redacted() {
        let state = test_state();
        seed(&state, "c1", &[("customer", "Patient SSN is 123-45-6789, call at 555-123-4567")]).await;

        let (status, json) = send(&state, get("/v1/conversations/c1/messages?limit=5")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["redacted"], true);
        assert_eq!(
            json["messages"][0]["text"],
            "Patient SSN is [REDACTED_SSN], call at [REDACTED_PHONE]"
        );
    }

    #[tokio::test]
    async fn unknown_conversation_is_404() {
        let state = test_state();
        let (status, _) = send(&state, get("/v1/conversations/nope/messages")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = send(&state, post_json("/v1/assist", json!({"conversation_id": "nope"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("nope"));
    }

    #[tokio::test]
    async fn assist_returns_all_capabilities() {
        let state = test_state();
        seed(&state, "c1", &[("customer", "I need a prescription refill")]).await;

        let (status, json) = send(&state, post_json("/v1/assist", json!({"conversation_id": "c1"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["conversation_id"], "c1");
        assert!(json["summary"].is_string());
        assert_eq!(json["smart_replies"].as_array().unwrap().len(), 2);
        assert_eq!(json["knowledge_snippets"].as_array().unwrap().len(), 1);
        assert_eq!(json["next_best_action"], "Check prescription status and process refill");
        let confidence = json["confidence_score"].as_f64().unwrap();
        assert!(confidence > 0.0 && confidence <= 1.0);
    }

    #[tokio::test]
    async fn assist_respects_flags() {
        let state = test_state();
        seed(&state, "c1", &[("customer", "hello")]).await;

        let (status, json) = send(
            &state,
            post_json(
                "/v1/assist",
                json!({
                    "conversation_id": "c1",
                    "include_summary": false,
                    "include_smart_replies": false,
                    "include_knowledge": false
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["summary"].is_null());
        assert!(json["smart_replies"].is_null());
        assert_eq!(json["confidence_score"], 0.0);
        assert!(json["next_best_action"].is_string());
    }

    #[tokio::test]
    async fn assist_rejects_empty_request() {
        let state = test_state();
        seed(&state, "c1", &[("customer", "hello")]).await;
        let (status, _) = send(
            &state,
            post_json(
                "/v1/assist",
                json!({
                    "conversation_id": "c1",
                    "include_summary": false,
                    "include_smart_replies": false,
                    "include_knowledge": false,
                    "include_next_action": false
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrap_up_logs_to_crm() {
        let state = test_state();
        seed(&state, "c1", &[("customer", "My MRN: 12345678, refill please")]).await;

        let (status, json) = send(
            &state,
            post_json("/v1/conversations/c1/wrap-up", json!({"customer_id": "cust-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["log_id"].as_str().unwrap().starts_with("LOG-"));
        assert!(json["summary"].is_string());
    }

    #[tokio::test]
    async fn metrics_reflect_activity() {
        let state = test_state();
        seed(&state, "c1", &[("customer", "call me at 555-123-4567")]).await;
        send(&state, post_json("/v1/assist", json!({"conversation_id": "c1"}))).await;

        let (status, json) = send(&state, get("/v1/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ledger"]["active_conversations"], 1);
        assert_eq!(json["ledger"]["total_messages"], 1);
        assert_eq!(json["telemetry"]["assists"]["total"], 1);
        assert_eq!(json["telemetry"]["redaction"]["by_category"]["phone"], 1);
        assert!(json["audit_entries"].as_u64().unwrap() >= 2);
    }

    #[tokio::test]
    async fn webhook_appends_message() {
        let state = test_state();
        let (status, json) = send(
            &state,
            post_json(
                "/webhooks/contact-center",
                json!({
                    "eventType": "v2.conversations.messages.created",
                    "conversationId": "c9",
                    "message": {"type": "agent", "text": "Hello, how can I help?"}
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["role"], "agent");

        let (status, _) = send(&state, get("/v1/conversations/c9/messages")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn webhook_signature_enforced() {
        let mut config = AppConfig::default();
        config.contact_center.webhook_secret = Some("hook-secret".into());
        let state = test_state_with(config);

        let body = json!({"eventType": "v2.conversations.start", "id": "c5"}).to_string();
        let (status, _) = send(&state, post_json("/webhooks/contact-center", serde_json::from_str(&body).unwrap())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let signature = SignatureVerifier::new(Some("hook-secret".into()))
            .sign(body.as_bytes())
            .unwrap();
        let req = Request::builder()
            .method("POST")
            .uri("/webhooks/contact-center")
            .header("content-type", "application/json")
            .header("X-Contact-Center-Signature", signature)
            .body(Body::from(body))
            .unwrap();
        let (status, json) = send(&state, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["action"], "registered");
    }

    #[tokio::test]
    async fn oversized_body_rejected() {
        let mut config = AppConfig::default();
        config.gateway.body_limit_bytes = 64;
        let state = test_state_with(config);

        let text = "x".repeat(256);
        let response = build_router(state)
            .oneshot(post_json("/v1/conversations/c1/messages", json!({"role": "customer", "text": text})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    /// Classifies everything as `prescription_refill` and keeps the text it saw.
    struct RecordingIntent {
        seen: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl assistline_core::IntentDetector for RecordingIntent {
        fn name(&self) -> &str {
            "recording"
        }

        async fn detect_intent(
            &self,
            _session_id: &str,
            text: &str,
            _language_code: &str,
        ) -> Result<assistline_core::IntentMatch, assistline_core::ProviderError> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(assistline_core::IntentMatch {
                name: "prescription_refill".into(),
                confidence: 0.82,
                parameters: serde_json::Map::new(),
                fulfillment_text: None,
            })
        }
    }

    fn intent_state() -> (SharedState, Arc<RecordingIntent>) {
        let detector = Arc::new(RecordingIntent {
            seen: std::sync::Mutex::new(Vec::new()),
        });
        let registry = ProviderRegistry::offline()
            .with_generator(Arc::new(StaticGenerator::new(STATIC_REPLY, 0.8)))
            .with_intent(detector.clone());
        let state = Arc::new(AppState::assemble(AppConfig::default(), registry).unwrap());
        (state, detector)
    }

    #[tokio::test]
    async fn intent_text_is_redacted_before_detection() {
        let (state, detector) = intent_state();
        let (status, json) = send(
            &state,
            post_json(
                "/v1/intent",
                json!({"session_id": "s-1", "text": "Refill please, my SSN is 123-45-6789"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["name"], "prescription_refill");

        let seen = detector.seen.lock().unwrap().clone();
        assert_eq!(seen, vec!["Refill please, my SSN is [REDACTED_SSN]".to_string()]);

        let audit = serde_json::to_string(&state.audit.entries()).unwrap();
        assert!(audit.contains("\"intent\":\"prescription_refill\""));
        assert!(!audit.contains("123-45-6789"));
        assert!(!audit.contains("Refill please"));
        assert_eq!(state.telemetry.snapshot().intent_detections, 1);
    }

    #[tokio::test]
    async fn intent_validation_and_missing_detector() {
        let (state, _) = intent_state();
        let (status, json) = send(&state, post_json("/v1/intent", json!({"session_id": "s-1", "text": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("text"));

        let (status, json) = send(
            &state,
            post_json("/v1/intent", json!({"session_id": "bad id!", "text": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("session_id"));

        let (status, _) = send(
            &test_state(),
            post_json("/v1/intent", json!({"session_id": "s-1", "text": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unknown_webhook_types_stay_in_one_bucket() {
        let state = test_state();
        for i in 0..20 {
            let (status, json) = send(
                &state,
                post_json(
                    "/webhooks/contact-center",
                    json!({"eventType": format!("patient SSN 123-45-{i:04} wants a refill")}),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["status"], "ignored");
            assert_eq!(json["event_type"], "unknown");
        }

        let (_, metrics) = send(&state, get("/v1/metrics")).await;
        let inbound = metrics["telemetry"]["inbound_events"].as_object().unwrap();
        assert_eq!(inbound.len(), 1);
        assert_eq!(inbound["unknown"], 20);
        assert!(!metrics.to_string().contains("123-45-"));
    }
}
