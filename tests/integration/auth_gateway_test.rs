//! Wire format of the authentication calls and the bearer header, checked
//! against a real HTTP server.
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use mockito::{Matcher, Server};
use serde_json::json;

use crate::harness::{
    console, mock_login, LOGIN_PATH, LOGOUT_PATH, METRICS_BODY, METRICS_PATH, REFRESH_PATH,
};
use logview360_lib::auth::{AuthGateway, HttpAuthGateway};
use logview360_lib::http::ReqwestHttpClient;
use logview360_lib::{AuthError, Credentials, LoginOutcome, SessionPhase};

fn gateway(url: String) -> Result<HttpAuthGateway> {
    let client = ReqwestHttpClient::with_timeout(Duration::from_secs(5))?;
    Ok(HttpAuthGateway::new(Arc::new(client), url))
}

#[tokio::test]
async fn login_posts_credentials_as_json() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", LOGIN_PATH)
        .match_header("content-type", "application/json")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({"username": "a", "password": "pw"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"token": "T1", "username": "a"}"#)
        .create_async()
        .await;

    let response = gateway(server.url())?
        .login(&Credentials::new("a", "pw"))
        .await?;

    assert_eq!(response.token, "T1");
    assert_eq!(response.username, "a");
    assert_eq!(response.refresh_token, None);
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn numeric_username_is_kept_as_text() -> Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("POST", LOGIN_PATH)
        .with_status(200)
        .with_body(r#"{"token": "T1", "username": 1012345678}"#)
        .create_async()
        .await;

    let response = gateway(server.url())?
        .login(&Credentials::new("1012345678", "pw"))
        .await?;

    assert_eq!(response.username, "1012345678");
    Ok(())
}

#[tokio::test]
async fn login_without_token_is_an_authentication_error() -> Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("POST", LOGIN_PATH)
        .with_status(200)
        .with_body(r#"{"username": "a", "token": null}"#)
        .create_async()
        .await;

    let err = gateway(server.url())?
        .login(&Credentials::new("a", "pw"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Authentication { status: None, .. }));
    Ok(())
}

#[tokio::test]
async fn rejected_login_carries_status_for_logs_only() -> Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("POST", LOGIN_PATH)
        .with_status(401)
        .with_body(r#"{"detail": "Invalid credentials"}"#)
        .create_async()
        .await;

    let err = gateway(server.url())?
        .login(&Credentials::new("a", "wrong"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Authentication { status: Some(401), .. }));
    assert!(!err.user_message().contains("Invalid credentials"));
    Ok(())
}

#[tokio::test]
async fn refresh_sends_refresh_token_and_accepts_token_alias() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", REFRESH_PATH)
        .match_body(Matcher::Json(json!({"refresh_token": "R1"})))
        .with_status(200)
        .with_body(r#"{"token": "T2", "refresh_token": "R2"}"#)
        .create_async()
        .await;

    let refreshed = gateway(server.url())?.refresh("R1").await?;

    assert_eq!(refreshed.access_token, "T2");
    assert_eq!(refreshed.refresh_token.as_deref(), Some("R2"));
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn session_token_reaches_the_wire() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    let anonymous = server
        .mock("GET", METRICS_PATH)
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(METRICS_BODY)
        .expect(1)
        .create_async()
        .await;

    let console = console(&server)?;
    console.data.latency_metrics().await?;
    anonymous.assert_async().await;

    let outcome = console.controller.login(Credentials::new("a", "pw")).await;
    assert!(matches!(outcome, LoginOutcome::Authenticated { .. }));

    let bearer = server
        .mock("GET", METRICS_PATH)
        .match_header("authorization", "Bearer T1")
        .with_status(200)
        .with_body(METRICS_BODY)
        .expect(1)
        .create_async()
        .await;
    console.data.latency_metrics().await?;
    bearer.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn refresh_rotates_tokens_through_the_controller() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    let refresh = server
        .mock("POST", REFRESH_PATH)
        .match_header("authorization", "Bearer T1")
        .match_body(Matcher::Json(json!({"refresh_token": "R1"})))
        .with_status(200)
        .with_body(r#"{"access_token": "T2", "refresh_token": "R2", "expires_in": 900}"#)
        .create_async()
        .await;

    let console = console(&server)?;
    console.controller.login(Credentials::new("a", "pw")).await;
    assert!(console.controller.refresh().await?);

    let session = console.controller.snapshot();
    assert_eq!(session.token.as_deref(), Some("T2"));
    assert_eq!(session.refresh_token.as_deref(), Some("R2"));
    refresh.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn logout_reaches_server_without_bearer() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    let logout = server
        .mock("POST", LOGOUT_PATH)
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({"refresh_token": "R1"})))
        .with_status(204)
        .create_async()
        .await;

    let console = console(&server)?;
    console.controller.login(Credentials::new("a", "pw")).await;

    assert!(console.controller.logout().await);
    assert_eq!(console.controller.snapshot().phase(), SessionPhase::Anonymous);
    logout.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn unreachable_logout_still_signs_out() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    server
        .mock("POST", LOGOUT_PATH)
        .with_status(503)
        .create_async()
        .await;

    let console = console(&server)?;
    console.controller.login(Credentials::new("a", "pw")).await;

    assert!(!console.controller.logout().await);
    let session = console.controller.snapshot();
    assert!(session.token.is_none());
    assert!(session.error.is_none());
    Ok(())
}
