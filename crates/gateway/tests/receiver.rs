//! HTTP receiver contract: a delivery is either enqueued exactly once (202)
//! or rejected with a terminal status — 400 on bad payloads, 403 on IP
//! denial, 405 on the wrong method, 503 when the queue is full.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use fh_agent::ApiAgentRunner;
use fh_domain::config::Config;
use fh_gateway::allowlist::IpAllowlist;
use fh_gateway::api;
use fh_gateway::queue::Job;
use fh_gateway::state::AppState;
use fh_tools::ToolRegistry;

const LABELED_PAYLOAD: &str = r#"{
    "action": "labeled",
    "label": {"name": "ai-ready"},
    "issue": {"number": 12, "state": "open", "title": "t", "body": "b", "labels": [{"name": "ai-ready"}]},
    "repository": {"full_name": "org/repo", "clone_url": "https://host/org/repo.git", "default_branch": "main"},
    "sender": {"login": "labeler"}
}"#;

fn test_state(allowlist: IpAllowlist, queue_capacity: usize) -> (AppState, mpsc::Receiver<Job>) {
    let (tx, rx) = mpsc::channel(queue_capacity);
    let mut config = Config::default();
    config.llm.base_url = "https://llm.invalid".into();
    config.llm.api_key = "unused".into();
    config.llm.model = "unused".into();
    let provider = fh_providers::from_config(&config.llm).unwrap();
    let chat = Arc::new(ApiAgentRunner::new(
        provider,
        Arc::new(ToolRegistry::new()),
        config.agent.clone(),
        "unused",
    ));
    let state = AppState {
        config: Arc::new(config),
        allowlist: Arc::new(allowlist),
        jobs: tx,
        chat,
        cancel: CancellationToken::new(),
    };
    (state, rx)
}

fn app(state: AppState) -> axum::Router {
    api::router(state).layer(MockConnectInfo(
        "203.0.113.9:443".parse::<SocketAddr>().unwrap(),
    ))
}

fn webhook_request(kind: &str, payload: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("x-github-event", kind)
        .header("x-github-delivery", "d-1")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn valid_delivery_is_accepted_and_enqueued_once() {
    let (state, mut rx) = test_state(IpAllowlist::default(), 8);
    let resp = app(state)
        .oneshot(webhook_request("issues", LABELED_PAYLOAD))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let job = rx.try_recv().expect("one job enqueued");
    assert_eq!(job.event.delivery_id, "d-1");
    assert!(rx.try_recv().is_err(), "no double enqueue");
}

#[tokio::test]
async fn missing_event_header_is_bad_request() {
    let (state, mut rx) = test_state(IpAllowlist::default(), 8);
    let req = Request::builder()
        .method("POST")
        .uri("/webhook")
        .body(Body::from(LABELED_PAYLOAD))
        .unwrap();
    let resp = app(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn unsupported_event_kind_is_bad_request() {
    let (state, _rx) = test_state(IpAllowlist::default(), 8);
    let resp = app(state)
        .oneshot(webhook_request("push", "{}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unparseable_body_is_bad_request() {
    let (state, _rx) = test_state(IpAllowlist::default(), 8);
    let resp = app(state)
        .oneshot(webhook_request("issues", "not json at all"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn denied_ip_is_forbidden() {
    let allowlist = IpAllowlist::parse(&["10.0.0.1".into()]).unwrap();
    let (state, mut rx) = test_state(allowlist, 8);
    let resp = app(state)
        .oneshot(webhook_request("issues", LABELED_PAYLOAD))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn forwarded_for_header_can_satisfy_the_allowlist() {
    let allowlist = IpAllowlist::parse(&["10.0.0.1".into()]).unwrap();
    let (state, mut rx) = test_state(allowlist, 8);
    let mut req = webhook_request("issues", LABELED_PAYLOAD);
    req.headers_mut()
        .insert("x-forwarded-for", "10.0.0.1".parse().unwrap());
    let resp = app(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert!(rx.try_recv().is_ok());
}

#[tokio::test]
async fn full_queue_returns_service_unavailable() {
    // Capacity 2, no workers draining.
    let (state, _rx) = test_state(IpAllowlist::default(), 2);
    let app = app(state);
    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(webhook_request("issues", LABELED_PAYLOAD))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }
    let resp = app
        .oneshot(webhook_request("issues", LABELED_PAYLOAD))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn wrong_method_is_method_not_allowed() {
    let (state, _rx) = test_state(IpAllowlist::default(), 8);
    let req = Request::builder()
        .method("GET")
        .uri("/webhook")
        .body(Body::empty())
        .unwrap();
    let resp = app(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (state, _rx) = test_state(IpAllowlist::default(), 8);
    let req = Request::builder()
        .method("GET")
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let resp = app(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
