//! Opt-in session persistence across console restarts
use std::sync::Arc;

use anyhow::Result;
use mockito::Server;

use crate::harness::{config_for, console_with_vault, mock_login, LOGOUT_PATH};
use logview360_lib::auth::FileVault;
use logview360_lib::notify::TracingNotifier;
use logview360_lib::{Console, Credentials, SessionPhase, TokenVault};

#[tokio::test]
async fn persisted_session_survives_a_restart() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("session.json");

    let mut config = config_for(&server);
    config.session.persist = true;
    config.session.store_path = path.clone();

    let first = Console::build(config.clone(), Arc::new(TracingNotifier))?;
    first.controller.login(Credentials::new("a", "pw")).await;
    assert!(path.exists());
    drop(first);

    let second = Console::build(config, Arc::new(TracingNotifier))?;
    assert_eq!(second.controller.snapshot().phase(), SessionPhase::Anonymous);
    assert!(second.controller.restore().await);

    let session = second.controller.snapshot();
    assert_eq!(session.username.as_deref(), Some("a"));
    assert_eq!(session.token.as_deref(), Some("T1"));
    assert_eq!(session.refresh_token.as_deref(), Some("R1"));
    Ok(())
}

#[tokio::test]
async fn stored_file_never_holds_the_password() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    let dir = tempfile::tempdir()?;
    let vault = Arc::new(FileVault::new(dir.path().join("session.json")));

    let console = console_with_vault(&server, vault.clone())?;
    console
        .controller
        .login(Credentials::new("a", "hunter2"))
        .await;

    let raw = std::fs::read_to_string(vault.path())?;
    assert!(!raw.contains("hunter2"));
    assert!(raw.contains("integrity_hash"));
    Ok(())
}

#[tokio::test]
async fn logout_deletes_the_stored_session() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    server
        .mock("POST", LOGOUT_PATH)
        .with_status(200)
        .create_async()
        .await;
    let dir = tempfile::tempdir()?;
    let vault = Arc::new(FileVault::new(dir.path().join("session.json")));

    let console = console_with_vault(&server, vault.clone())?;
    console.controller.login(Credentials::new("a", "pw")).await;
    assert!(vault.path().exists());

    console.controller.logout().await;

    assert!(!vault.path().exists());
    Ok(())
}

#[tokio::test]
async fn tampered_file_is_discarded_not_restored() -> Result<()> {
    let mut server = Server::new_async().await;
    mock_login(&mut server).await;
    let dir = tempfile::tempdir()?;
    let vault = Arc::new(FileVault::new(dir.path().join("session.json")));

    let console = console_with_vault(&server, vault.clone())?;
    console.controller.login(Credentials::new("a", "pw")).await;
    drop(console);

    let raw = std::fs::read_to_string(vault.path())?;
    std::fs::write(vault.path(), raw.replace("\"a\"", "\"admin\""))?;

    let restarted = console_with_vault(&server, vault.clone())?;
    assert!(!restarted.controller.restore().await);
    assert_eq!(restarted.controller.snapshot().phase(), SessionPhase::Anonymous);
    assert!(!vault.path().exists());
    assert!(vault.load().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn unreadable_file_is_discarded() -> Result<()> {
    let server = Server::new_async().await;
    let dir = tempfile::tempdir()?;
    let vault = Arc::new(FileVault::new(dir.path().join("session.json")));
    std::fs::write(vault.path(), "not json")?;

    let console = console_with_vault(&server, vault.clone())?;

    assert!(!console.controller.restore().await);
    assert!(!vault.path().exists());
    Ok(())
}
