use axum::body::Body;
use axum::http::StatusCode;
use dashmap::DashMap;
use http_body_util::BodyExt;
use kestrel::api::{build_router, create_app_state, AppState};
use kestrel::config::{AuthKind, KestrelConfig, LlmConfig, LlmRoleConfig, TargetAuth, TargetConfig, TargetProtocol};
use kestrel::store::ArtifactStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_config() -> KestrelConfig {
    let role = Some(LlmRoleConfig {
        provider: Some("anthropic".to_string()),
        model: None,
        api_key: Some("test-key".to_string()),
        base_url: None,
    });
    KestrelConfig {
        target: Some(TargetConfig {
            url: "https://target.example/chat".to_string(),
            protocol: TargetProtocol::Http,
            message_field: "message".to_string(),
            auth: TargetAuth { kind: AuthKind::None, header_name: None, token: None, username: None, password: None },
            request_timeout_secs: 30,
            ws_session_id: None,
        }),
        llm: Some(LlmConfig { reasoning: role.clone(), scoring: role.clone(), reconnaissance: role, reasoning_timeout_secs: 30, schema_retries: 2 }),
        ..Default::default()
    }
}

fn create_test_state() -> AppState {
    let store = ArtifactStore::in_memory().unwrap();
    create_app_state(store, test_config(), 4)
}

fn app(state: &AppState) -> axum::Router {
    build_router(state.clone())
}

fn make_request(method: &str, uri: &str, body: Option<Value>) -> axum::http::Request<Body> {
    let builder = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    match body {
        Some(b) => builder.body(Body::from(serde_json::to_string(&b).unwrap())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn response_json(response: axum::http::Response<Body>) -> Value {
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        panic!("Empty response body. Status: {}, Headers: {:?}", parts.status, parts.headers);
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("JSON parse error: {}. Body: {:?}", e, String::from_utf8_lossy(&bytes)))
}

#[tokio::test]
async fn test_health_endpoint() {
    let state = create_test_state();
    let req = make_request("GET", "/api/health", None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_get_campaign_not_found() {
    let state = create_test_state();
    let req = make_request("GET", "/api/campaigns/nonexistent-id", None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_campaigns_empty() {
    let state = create_test_state();
    let req = make_request("GET", "/api/campaigns", None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_get_campaign_after_direct_store_insert() {
    let state = create_test_state();
    let campaign = kestrel::models::Campaign::new("c1", "https://target.example", chrono::Utc::now());
    state.store.create_campaign(&campaign).unwrap();

    let req = make_request("GET", "/api/campaigns/c1", None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["id"], "c1");
    assert_eq!(body["target_url"], "https://target.example");
}

#[tokio::test]
async fn test_list_campaigns_after_direct_store_insert() {
    let state = create_test_state();
    state.store.create_campaign(&kestrel::models::Campaign::new("c1", "http://a.example", chrono::Utc::now())).unwrap();
    state.store.create_campaign(&kestrel::models::Campaign::new("c2", "http://b.example", chrono::Utc::now())).unwrap();

    let req = make_request("GET", "/api/campaigns", None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_stop_campaign_not_active() {
    let state = create_test_state();
    let req = make_request("POST", "/api/campaigns/nonexistent/stop", None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stop_campaign_active_cancels_token() {
    let state = create_test_state();
    state.store.create_campaign(&kestrel::models::Campaign::new("c1", "http://a.example", chrono::Utc::now())).unwrap();

    let handle = Arc::new(kestrel::api::CampaignHandle {
        event_bus: Arc::new(kestrel::pipeline::CampaignEventBus::new(16)),
        cancel_token: tokio_util::sync::CancellationToken::new(),
    });
    state.active_campaigns.insert("c1".to_string(), handle.clone());

    let req = make_request("POST", "/api/campaigns/c1/stop", None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(handle.cancel_token.is_cancelled());
}

#[tokio::test]
async fn test_report_for_campaign_with_no_artifacts() {
    let state = create_test_state();
    state.store.create_campaign(&kestrel::models::Campaign::new("c1", "http://a.example", chrono::Utc::now())).unwrap();

    let req = make_request("GET", "/api/campaigns/c1/report", None);
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert!(body["vulnerability_report"].is_null());
    assert!(body["exploit_result"].is_null());
}

#[tokio::test]
async fn test_create_campaign_rejects_when_active_slots_exhausted() {
    let store = ArtifactStore::in_memory().unwrap();
    let state = create_app_state(store, test_config(), 0);

    let req = make_request("POST", "/api/campaigns", Some(json!({ "target_url": "http://example.com" })));
    let response = app(&state).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
