//! HTTP surface tests driven through the router with `tower::ServiceExt`.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use bytes::Bytes;
use framewall_core::RegistryBuilder;
use framewall_server::{config::Config, routes::create_router, state::AppState};
use futures_util::StreamExt;
use tower::ServiceExt;

fn test_config(topics: &[&str]) -> Config {
    let mut config = Config::default();
    config.subscriptions = topics
        .iter()
        .map(|topic| framewall_server::config::SubscriptionConfig {
            topic: (*topic).to_string(),
            endpoint: "127.0.0.1:0".to_string(),
        })
        .collect();
    config
}

fn test_router(topics: &[&str]) -> (Router, AppState) {
    let config = test_config(topics);
    let mut builder = RegistryBuilder::new(config.relay.buffer_capacity);
    for sub in &config.subscriptions {
        builder.register(&sub.topic).unwrap();
    }
    let state = AppState::new(
        Arc::new(builder.build()),
        Arc::new(config),
        Bytes::from_static(b"\xff\xd8placeholder\xff\xd9"),
    );
    (create_router(state.clone(), false), state)
}

async fn body_json(body: Body) -> serde_json::Value {
    let bytes = axum::body::to_bytes(body, 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn topics_lists_subscriptions_in_configured_order() {
    let (router, _) = test_router(&["cam2", "cam0", "cam1"]);

    let response = router
        .oneshot(Request::get("/topics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let value = body_json(response.into_body()).await;
    assert_eq!(value, serde_json::json!(["cam2", "cam0", "cam1"]));
}

#[tokio::test]
async fn landing_page_links_every_topic() {
    let (router, _) = test_router(&["cam0", "cam1"]);

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("href=\"/cam0\""));
    assert!(html.contains("href=\"/cam1\""));
}

#[tokio::test]
async fn health_reports_topic_count_and_buffer_depths() {
    let (router, state) = test_router(&["cam0"]);
    state
        .registry
        .get("cam0")
        .unwrap()
        .push(Bytes::from_static(b"frame"));

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let value = body_json(response.into_body()).await;
    assert_eq!(value["status"], "ok");
    assert_eq!(value["topics"], 1);
    assert_eq!(value["buffers"]["cam0"], 1);
}

#[tokio::test]
async fn unknown_topic_is_a_400_and_allocates_nothing() {
    let (router, state) = test_router(&["cam0"]);

    let response = router
        .oneshot(Request::get("/cam9").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let value = body_json(response.into_body()).await;
    assert!(
        value["error"]["message"]
            .as_str()
            .unwrap()
            .contains("cam9")
    );
    assert_eq!(state.registry.len(), 1);
    assert!(state.registry.get("cam9").is_none());
}

#[tokio::test]
async fn stream_response_is_multipart_with_framed_chunks() {
    let (router, state) = test_router(&["cam0"]);
    state
        .registry
        .get("cam0")
        .unwrap()
        .push(Bytes::from_static(b"jpegframe"));

    let response = router
        .oneshot(Request::get("/cam0").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "multipart/x-mixed-replace; boundary=frame"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

    let mut chunks = response.into_body().into_data_stream();
    let first = chunks.next().await.unwrap().unwrap();
    assert!(first.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
    assert!(first.ends_with(b"jpegframe\r\n"));
}

#[tokio::test]
async fn empty_buffer_streams_the_placeholder_first() {
    let (router, state) = test_router(&["cam0"]);

    let response = router
        .oneshot(Request::get("/cam0").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut chunks = response.into_body().into_data_stream();
    let first = chunks.next().await.unwrap().unwrap();
    let placeholder = &state.placeholder;
    assert!(first.ends_with(&[placeholder.as_ref(), b"\r\n"].concat()));
}

#[tokio::test]
async fn security_headers_cover_json_but_not_streams() {
    let (router, state) = test_router(&["cam0"]);
    state
        .registry
        .get("cam0")
        .unwrap()
        .push(Bytes::from_static(b"jpegframe"));

    let json = router
        .clone()
        .oneshot(Request::get("/topics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(json.headers()["x-content-type-options"], "nosniff");
    assert_eq!(json.headers()["x-frame-options"], "DENY");
    assert!(json.headers().get(header::STRICT_TRANSPORT_SECURITY).is_none());

    let stream = router
        .oneshot(Request::get("/cam0").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(stream.headers().get("x-content-type-options").is_none());
    assert!(stream.headers().get("x-frame-options").is_none());
}
