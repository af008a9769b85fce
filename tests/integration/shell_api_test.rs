//! The local shell API, driven in-process through `tower::ServiceExt::oneshot`
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::Router;
use http::{Request, StatusCode};
use mockito::{Server, ServerGuard};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::harness::{
    config_for, console, mock_login, LOGIN_PATH, METRICS_BODY, METRICS_PATH, REFRESH_PATH,
};
use logview360_lib::api::{router, ShellState};
use logview360_lib::auth::EphemeralVault;
use logview360_lib::error::SIGN_IN_FAILED_MESSAGE;
use logview360_lib::http::ReqwestHttpClient;
use logview360_lib::notify::QueuedNotifier;
use logview360_lib::Console;

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => request.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

fn shell(server: &ServerGuard) -> Result<Router> {
    Ok(router(ShellState::new(&console(server)?)))
}

async fn sign_in(app: &Router) -> Result<()> {
    let (status, _) = call(
        app,
        "POST",
        "/api/session/login",
        Some(json!({"username": "a", "password": "pw"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn session_starts_anonymous_on_the_login_page() -> Result<()> {
    let server = Server::new_async().await;
    let app = shell(&server)?;

    let (status, body) = call(&app, "GET", "/api/session", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["phase"], "anonymous");
    assert_eq!(body["data"]["authenticated"], false);
    assert_eq!(body["data"]["route"], "/");
    Ok(())
}

#[tokio::test]
async fn incomplete_login_form_is_refused_before_any_call() -> Result<()> {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", LOGIN_PATH)
        .expect(0)
        .create_async()
        .await;
    let app = shell(&server)?;

    let (status, body) = call(
        &app,
        "POST",
        "/api/session/login",
        Some(json!({"username": "a", "password": ""})),
    )
    .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    login.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn login_returns_session_without_tokens() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    let app = shell(&server)?;

    let (status, body) = call(
        &app,
        "POST",
        "/api/session/login",
        Some(json!({"username": "a", "password": "pw"})),
    )
    .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "a");
    assert_eq!(body["data"]["phase"], "authenticated");
    assert_eq!(body["data"]["route"], "/app/inicio");
    let raw = body.to_string();
    assert!(!raw.contains("T1"));
    assert!(!raw.contains("R1"));
    Ok(())
}

#[tokio::test]
async fn failed_login_reports_only_the_fixed_message() -> Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("POST", LOGIN_PATH)
        .with_status(401)
        .with_body(r#"{"detail": "user a is locked"}"#)
        .create_async()
        .await;
    let app = shell(&server)?;

    let (status, body) = call(
        &app,
        "POST",
        "/api/session/login",
        Some(json!({"username": "a", "password": "pw"})),
    )
    .await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], SIGN_IN_FAILED_MESSAGE);

    let (_, session) = call(&app, "GET", "/api/session", None).await?;
    assert_eq!(session["data"]["phase"], "failed");
    assert_eq!(session["data"]["error"], SIGN_IN_FAILED_MESSAGE);
    Ok(())
}

#[tokio::test]
async fn protected_routes_need_a_session() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    let app = shell(&server)?;

    let (_, body) = call(&app, "POST", "/api/route", Some(json!({"path": "/app/secuCheck"}))).await?;
    assert_eq!(body["data"]["path"], "/");
    assert_eq!(body["data"]["redirected"], true);

    sign_in(&app).await?;

    let (_, body) = call(&app, "POST", "/api/route", Some(json!({"path": "/app/secuCheck"}))).await?;
    assert_eq!(body["data"]["path"], "/app/secuCheck");
    assert_eq!(body["data"]["redirected"], false);

    let (_, body) = call(&app, "GET", "/api/route", None).await?;
    assert_eq!(body["data"]["path"], "/app/secuCheck");
    Ok(())
}

#[tokio::test]
async fn metrics_need_a_session() -> Result<()> {
    let server = Server::new_async().await;
    let app = shell(&server)?;

    let (status, _) = call(&app, "GET", "/api/metrics", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "GET", "/api/metrics/latency", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn metric_sections_render_as_paged_tables() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    server
        .mock("GET", METRICS_PATH)
        .match_header("authorization", "Bearer T1")
        .with_status(200)
        .with_body(METRICS_BODY)
        .create_async()
        .await;
    let app = shell(&server)?;
    sign_in(&app).await?;

    let (status, body) = call(&app, "GET", "/api/metrics/latency?page=1&size=2", None).await?;

    assert_eq!(status, StatusCode::OK);
    let table = &body["data"];
    assert_eq!(table["headers"][0]["key"], "metric");
    assert_eq!(table["rows"].as_array().map(Vec::len), Some(1));
    assert_eq!(table["rows"][0]["cells"], json!(["p99_ms", "870"]));
    assert_eq!(table["paginator"]["total_items"], 3);
    assert_eq!(table["paginator"]["page_size"], 2);

    let (status, _) = call(&app, "GET", "/api/metrics/bogus", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn upstream_outage_is_a_bad_gateway() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    server
        .mock("GET", METRICS_PATH)
        .with_status(503)
        .create_async()
        .await;
    let app = shell(&server)?;
    sign_in(&app).await?;

    let (status, body) = call(&app, "GET", "/api/metrics", None).await?;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn refresh_without_session_conflicts() -> Result<()> {
    let server = Server::new_async().await;
    let app = shell(&server)?;

    let (status, _) = call(&app, "POST", "/api/session/refresh", None).await?;

    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn rejected_refresh_is_unauthorized_and_keeps_the_session() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    server
        .mock("POST", REFRESH_PATH)
        .with_status(401)
        .with_body(r#"{"detail": "refresh token R1 revoked"}"#)
        .create_async()
        .await;
    let app = shell(&server)?;
    sign_in(&app).await?;

    let (status, body) = call(&app, "POST", "/api/session/refresh", None).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!body.to_string().contains("revoked"));
    let (_, session) = call(&app, "GET", "/api/session", None).await?;
    assert_eq!(session["data"]["phase"], "authenticated");
    Ok(())
}

#[tokio::test]
async fn logout_reports_remote_outcome() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    server
        .mock("POST", "/api/v1/auth/logout")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    let app = shell(&server)?;
    sign_in(&app).await?;

    let (status, body) = call(&app, "POST", "/api/session/logout", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["remote_revoked"], true);

    let (_, session) = call(&app, "GET", "/api/session", None).await?;
    assert_eq!(session["data"]["phase"], "anonymous");
    assert_eq!(session["data"]["route"], "/");
    Ok(())
}

#[tokio::test]
async fn queued_notifications_are_listed_and_answered() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;

    let (notifier, inbox) = QueuedNotifier::new();
    let console = Console::with_transport(
        config_for(&server),
        Arc::new(ReqwestHttpClient::with_timeout(Duration::from_secs(5))?),
        Arc::new(notifier),
        Arc::new(EphemeralVault::new()),
    );
    let app = router(ShellState::new(&console).with_inbox(inbox));
    sign_in(&app).await?;

    let (_, body) = call(&app, "GET", "/api/notifications", None).await?;
    let pending = body["data"].as_array().cloned().unwrap_or_default();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["kind"], "success");
    let id = pending[0]["id"].as_str().unwrap_or_default().to_string();

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/notifications/{}", id),
        Some(json!({"confirmed": true})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, "GET", "/api/notifications", None).await?;
    assert_eq!(body["data"], json!([]));

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/notifications/{}", id),
        Some(json!({"confirmed": false})),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}
