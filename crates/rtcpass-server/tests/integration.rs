#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! End-to-end tests for the token endpoint, driven through the router.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use rtcpass_server::routes::{AppState, build_router};
use rtcpass_token::{AppCredentials, DecodedToken, Privilege, TokenIssuer};

const APP_ID: &str = "970CA35de60c44645bbae8a215061b33";
const APP_SECRET: &str = "5CFd2fd1755d40ecb72977518be15d3b";

fn app_with_validity(validity_secs: u32) -> axum::Router {
    let creds = AppCredentials::new(APP_ID, APP_SECRET).unwrap();
    let state = AppState::new(TokenIssuer::new(creds, validity_secs));
    build_router(state, &["*".to_string()])
}

fn app() -> axum::Router {
    app_with_validity(86_400)
}

/// POST a raw body to `/agora-token` and return (status, parsed JSON).
async fn post_raw(app: axum::Router, body: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/agora-token")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post(body: Value) -> (StatusCode, Value) {
    post_raw(app(), &body.to_string()).await
}

fn decode(resp: &Value) -> DecodedToken {
    DecodedToken::parse(resp["token"].as_str().unwrap(), APP_ID).unwrap()
}

#[tokio::test]
async fn issues_publisher_token_by_default() {
    let (status, resp) = post(json!({ "channelName": "room42" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["appId"], APP_ID);
    assert_eq!(resp["channel"], "room42");
    assert_eq!(resp["uid"], 0);

    let token = resp["token"].as_str().unwrap();
    assert!(token.starts_with(&format!("007{APP_ID}")));

    let decoded = decode(&resp);
    assert_eq!(decoded.privileges.len(), 4);
    let expiry = decoded.issued_at + 86_400;
    for privilege in [
        Privilege::JoinChannel,
        Privilege::PublishAudio,
        Privilege::PublishVideo,
        Privilege::PublishData,
    ] {
        assert_eq!(decoded.privileges.get(privilege), Some(expiry));
    }
    assert!(decoded.verify(APP_SECRET.as_bytes(), "room42", "0"));
}

#[tokio::test]
async fn subscriber_gets_join_only() {
    let (status, resp) = post(json!({ "channelName": "room42", "uid": 77, "role": 0 })).await;
    assert_eq!(status, StatusCode::OK);
    let decoded = decode(&resp);
    assert_eq!(decoded.privileges.len(), 1);
    assert!(decoded.privileges.get(Privilege::JoinChannel).is_some());
}

#[tokio::test]
async fn numeric_uid_is_echoed_as_number_and_signed_as_string() {
    let (status, resp) = post(json!({ "channelName": "room42", "uid": 77 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["uid"], json!(77));
    assert!(decode(&resp).verify(APP_SECRET.as_bytes(), "room42", "77"));
}

#[tokio::test]
async fn string_uid_is_echoed_as_string() {
    let (status, resp) = post(json!({ "channelName": "room42", "uid": "alice" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["uid"], json!("alice"));
    assert!(decode(&resp).verify(APP_SECRET.as_bytes(), "room42", "alice"));
}

#[tokio::test]
async fn response_never_contains_secret() {
    let (_, resp) = post(json!({ "channelName": "room42", "uid": 1 })).await;
    assert!(!resp.to_string().contains(APP_SECRET));
}

#[tokio::test]
async fn repeated_requests_yield_distinct_tokens() {
    let (_, a) = post(json!({ "channelName": "room42", "uid": 1 })).await;
    let (_, b) = post(json!({ "channelName": "room42", "uid": 1 })).await;
    assert_ne!(a["token"], b["token"]);
}

#[tokio::test]
async fn empty_channel_is_bad_request() {
    let (status, resp) = post(json!({ "channelName": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"], "channelName is required");
}

#[tokio::test]
async fn missing_channel_is_bad_request() {
    let (status, resp) = post(json!({ "uid": 5 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"].is_string());
}

#[tokio::test]
async fn unknown_role_is_bad_request() {
    let (status, resp) = post(json!({ "channelName": "room42", "role": 7 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"].as_str().unwrap().contains("role"));
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let (status, resp) = post_raw(app(), "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"].is_string());
}

#[tokio::test]
async fn overflowing_validity_is_bad_request() {
    let (status, resp) = post_raw(app_with_validity(u32::MAX), r#"{"channelName":"room42"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["error"].as_str().unwrap().contains("overflows"));
}

#[tokio::test]
async fn health_returns_ok() {
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn get_on_token_route_is_not_allowed() {
    let req = Request::builder().uri("/agora-token").body(Body::empty()).unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/agora-token")
        .header("origin", "https://app.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type,apikey")
        .body(Body::empty())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn cors_rejects_unlisted_origin() {
    let creds = AppCredentials::new(APP_ID, APP_SECRET).unwrap();
    let state = AppState::new(TokenIssuer::new(creds, 60));
    let app = build_router(state, &["https://app.example".to_string()]);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/agora-token")
        .header("origin", "https://evil.example")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"channelName":"room42"}"#))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert!(resp.headers().get("access-control-allow-origin").is_none());
}
