mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use serde_json::Value;
use smart_erp::gateway::{CacheGateway, CacheStorage, MemoryCacheStorage};
use smart_erp::infra::http::{CONTROL_PATH, GatewayState, SOURCE_HEADER, STATUS_PATH, build_router};
use tower::ServiceExt;

use common::{ScriptedFetcher, active_gateway, gateway_with};

fn router_for(gateway: CacheGateway) -> Router {
    build_router(GatewayState::new(Arc::new(gateway)))
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

fn post_message(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(CONTROL_PATH)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

fn source(response: &Response) -> &str {
    response
        .headers()
        .get(&SOURCE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should collect");
    String::from_utf8_lossy(&bytes).into_owned()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

#[tokio::test]
async fn proxy_reports_where_each_response_came_from() {
    let fetcher = ScriptedFetcher::new();
    let app = router_for(active_gateway(MemoryCacheStorage::new(), fetcher.clone()).await);

    let first = send(&app, get("/assets/app.js")).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(source(&first), "network");
    assert_eq!(body_text(first).await, "body of /assets/app.js");

    let second = send(&app, get("/assets/app.js")).await;
    assert_eq!(source(&second), "cache");

    fetcher.set_offline(true);
    let navigation = Request::builder()
        .uri("/planning")
        .header(header::ACCEPT, "text/html")
        .body(Body::empty())
        .expect("request should build");
    let offline = send(&app, navigation).await;
    assert_eq!(offline.status(), StatusCode::OK);
    assert_eq!(source(&offline), "offline");
    assert_eq!(body_text(offline).await, "body of /");
}

#[tokio::test]
async fn unreachable_origin_without_cached_copy_is_bad_gateway() {
    let fetcher = ScriptedFetcher::new();
    let app = router_for(active_gateway(MemoryCacheStorage::new(), fetcher.clone()).await);
    fetcher.set_offline(true);

    let response = send(&app, get("/api/planning-entry")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn request_bodies_are_forwarded() {
    let fetcher = ScriptedFetcher::new();
    let app = router_for(active_gateway(MemoryCacheStorage::new(), fetcher.clone()).await);
    let before = fetcher.calls();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/planning-entry")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"entries":[]}"#))
        .expect("request should build");
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(source(&response), "network");
    assert_eq!(fetcher.calls(), before + 1);
}

#[tokio::test]
async fn clear_cache_message_reports_deleted_partitions() {
    let app = router_for(active_gateway(MemoryCacheStorage::new(), ScriptedFetcher::new()).await);

    let response = send(&app, post_message(r#"{"type":"CLEAR_CACHE"}"#)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "cleared");
    assert_eq!(body["state"], "active");
    assert_eq!(body["deleted"], serde_json::json!(["smart-erp-static-v1"]));
}

#[tokio::test]
async fn skip_waiting_message_activates_an_installed_gateway() {
    let gateway = gateway_with(MemoryCacheStorage::new(), ScriptedFetcher::new());
    gateway.install().await.expect("install");
    let app = router_for(gateway);

    let status = body_json(send(&app, get(STATUS_PATH)).await).await;
    assert_eq!(status["state"], "installed");

    let response = send(&app, post_message(r#"{"type":"SKIP_WAITING"}"#)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "activated");
    assert_eq!(body["state"], "active");

    let status = body_json(send(&app, get(STATUS_PATH)).await).await;
    assert_eq!(status["state"], "active");
    assert_eq!(status["refreshes_in_flight"], 0);
}

#[tokio::test]
async fn skip_waiting_before_install_is_a_conflict() {
    let app = router_for(gateway_with(MemoryCacheStorage::new(), ScriptedFetcher::new()));

    let response = send(&app, post_message(r#"{"type":"SKIP_WAITING"}"#)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_messages_are_rejected() {
    let app = router_for(active_gateway(MemoryCacheStorage::new(), ScriptedFetcher::new()).await);

    let response = send(&app, post_message(r#"{"type":"RELOAD"}"#)).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn scheme_relative_targets_stay_on_the_gateway_origin() {
    let storage = MemoryCacheStorage::new();
    let fetcher = ScriptedFetcher::new();
    let app = router_for(active_gateway(storage.clone(), fetcher.clone()).await);

    let response = send(&app, get("//other.host/x.js")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let hosts: Vec<Option<String>> = fetcher
        .requested()
        .iter()
        .map(|url| url.host_str().map(str::to_string))
        .collect();
    assert!(!hosts.is_empty());
    assert!(
        hosts.iter().all(|host| host.as_deref() == Some("erp.local")),
        "fetched outside the origin: {hosts:?}"
    );
    assert!(
        storage
            .match_any("http://other.host/x.js")
            .await
            .is_none()
    );
    assert!(
        storage
            .get("smart-erp-static-v1", "http://erp.local//other.host/x.js")
            .await
            .is_some()
    );
}

#[tokio::test]
async fn oversized_request_bodies_are_rejected() {
    let fetcher = ScriptedFetcher::new();
    let gateway = active_gateway(MemoryCacheStorage::new(), fetcher.clone()).await;
    let app = build_router(GatewayState::new(Arc::new(gateway)).with_body_limit(16));
    let before = fetcher.calls();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/planning-entry")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(vec![b'x'; 64]))
        .expect("request should build");
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(fetcher.calls(), before, "nothing forwarded");

    let small = Request::builder()
        .method(Method::POST)
        .uri("/api/planning-entry")
        .body(Body::from("{}"))
        .expect("request should build");
    assert_eq!(send(&app, small).await.status(), StatusCode::OK);
}
