//! Integration tests for the auth flow
//!
//! Drive the pipeline directly and through the HTTP router with an
//! in-process `oneshot`, no listener involved.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Duration;
use geoservice_backend::{
    app,
    auth::{AuthError, AuthPipeline, Clock, Denial, ManualClock, RequestContext},
    config::Config,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn test_config() -> Config {
    let mut config = Config::default();
    config.token.secret = "integration-test-secret-integration-test".to_string();
    config.password.hash_cost = 4;
    config
}

fn pipeline_with_clock() -> (Arc<AuthPipeline>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let shared: Arc<dyn Clock> = clock.clone();
    let pipeline = Arc::new(AuthPipeline::from_config(&test_config(), shared));
    (pipeline, clock)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, body)
}

fn json_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_bearer(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn challenge(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(header::WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn register_and_login(app: &Router, login: &str, password: &str) -> String {
    let creds = json!({ "login": login, "password": password });
    let (status, _, _) = send(app, json_post("/api/register", creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, body) = send(app, json_post("/api/login", creds)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    body["access_token"].as_str().unwrap().to_string()
}

#[test]
fn test_pipeline_register_login_logout() {
    let (pipeline, _clock) = pipeline_with_clock();
    let ctx = RequestContext::new("it-1");

    pipeline.register(&ctx, "alice", "pw1").unwrap();
    assert_eq!(
        pipeline.register(&ctx, "alice", "other"),
        Err(AuthError::BadRequest)
    );

    let token = pipeline.login(&ctx, "alice", "pw1").unwrap();
    let claims = pipeline.authorize(&ctx, Some(&token)).unwrap();
    assert_eq!(claims.sub, "alice");

    pipeline.logout(&ctx, &claims).unwrap();
    assert_eq!(pipeline.authorize(&ctx, Some(&token)), Err(Denial::Revoked));
    assert!(pipeline.is_token_revoked(&ctx, &claims.jti));

    // A fresh login is unaffected by the earlier logout
    let second = pipeline.login(&ctx, "alice", "pw1").unwrap();
    assert!(pipeline.authorize(&ctx, Some(&second)).is_ok());
}

#[test]
fn test_pipeline_unknown_and_wrong_password_look_the_same() {
    let (pipeline, _clock) = pipeline_with_clock();
    let ctx = RequestContext::new("it-2");

    pipeline.register(&ctx, "alice", "pw1").unwrap();
    assert_eq!(
        pipeline.login(&ctx, "bob", "pw1"),
        Err(AuthError::InvalidCredentials)
    );
    assert_eq!(
        pipeline.login(&ctx, "alice", "nope"),
        Err(AuthError::InvalidCredentials)
    );
}

#[test]
fn test_pipeline_revocation_forgotten_after_expiry() {
    let (pipeline, clock) = pipeline_with_clock();
    let ctx = RequestContext::new("it-3");

    pipeline.register(&ctx, "alice", "pw1").unwrap();
    let token = pipeline.login(&ctx, "alice", "pw1").unwrap();
    let claims = pipeline.authorize(&ctx, Some(&token)).unwrap();
    pipeline.logout(&ctx, &claims).unwrap();
    assert_eq!(pipeline.revocations().len(), 1);

    let config = test_config();
    clock.advance(config.token.ttl() + config.token.skew() + Duration::seconds(1));

    // Expired wins over revoked once the deadline has passed
    assert_eq!(pipeline.authorize(&ctx, Some(&token)), Err(Denial::Expired));
    assert!(!pipeline.is_token_revoked(&ctx, &claims.jti));
    assert!(pipeline.revocations().is_empty());
}

#[tokio::test]
async fn test_http_full_session() {
    let (pipeline, _clock) = pipeline_with_clock();
    let app = app::router(pipeline);

    let token = register_and_login(&app, "alice", "pw1").await;

    let (status, _, body) = send(&app, with_bearer("GET", "/api/me", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["login"], "alice");

    let (status, _, body) = send(&app, with_bearer("DELETE", "/api/logout", &token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, headers, body) = send(&app, with_bearer("GET", "/api/me", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(challenge(&headers).contains("revoked"));
    assert_eq!(body["error"], "token_revoked");

    // Logging out twice with the same token is rejected by the gate
    let (status, _, _) = send(&app, with_bearer("DELETE", "/api/logout", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_http_registration_errors() {
    let (pipeline, _clock) = pipeline_with_clock();
    let app = app::router(pipeline);

    register_and_login(&app, "alice", "pw1").await;

    let (status, _, body) = send(
        &app,
        json_post("/api/register", json!({ "login": "alice", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let (status, _, _) = send(&app, json_post("/api/register", json!({ "login": "bob" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(
        &app,
        json_post("/api/login", json!({ "login": "bob", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_http_over_long_password_rejected() {
    let (pipeline, _clock) = pipeline_with_clock();
    let app = app::router(pipeline);

    let prefix = "A".repeat(72);
    register_and_login(&app, "alice", &prefix).await;

    let (status, _, body) = send(
        &app,
        json_post(
            "/api/login",
            json!({ "login": "alice", "password": format!("{}WRONG", prefix) }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let (status, _, _) = send(
        &app,
        json_post(
            "/api/register",
            json!({ "login": "bob", "password": format!("{}correct", prefix) }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_http_missing_and_bad_tokens() {
    let (pipeline, _clock) = pipeline_with_clock();
    let app = app::router(pipeline);

    let req = Request::builder()
        .uri("/api/me")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(challenge(&headers), "Bearer");

    let (status, headers, body) = send(&app, with_bearer("GET", "/api/me", "not.a.token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(challenge(&headers).contains("invalid_token"));
    assert_eq!(body["error"], "token_malformed");
}

#[tokio::test]
async fn test_http_expired_token() {
    let (pipeline, clock) = pipeline_with_clock();
    let app = app::router(pipeline);

    let token = register_and_login(&app, "alice", "pw1").await;
    clock.advance(Duration::seconds(600 + 30 + 1));

    let (status, headers, body) = send(&app, with_bearer("GET", "/api/me", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(challenge(&headers).contains("Token expired"));
    assert_eq!(body["error"], "token_expired");
}

#[tokio::test]
async fn test_http_cookie_token() {
    let (pipeline, _clock) = pipeline_with_clock();
    let app = app::router(pipeline);

    let token = register_and_login(&app, "alice", "pw1").await;

    let req = Request::builder()
        .uri("/api/me")
        .header(header::COOKIE, format!("jwt={}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["login"], "alice");
}

#[tokio::test]
async fn test_http_request_id_propagated() {
    let (pipeline, _clock) = pipeline_with_clock();
    let app = app::router(pipeline);

    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-abc")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("x-request-id").unwrap(), "req-abc");

    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert!(resp.headers().get("x-request-id").is_some());
}
