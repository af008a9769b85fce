//! Shared setup: a console wired to a mockito server over reqwest

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use mockito::{Mock, ServerGuard};

use logview360_lib::auth::EphemeralVault;
use logview360_lib::http::ReqwestHttpClient;
use logview360_lib::notify::TracingNotifier;
use logview360_lib::{Config, Console, TokenVault};

pub const LOGIN_PATH: &str = "/api/v1/auth/login";
pub const REFRESH_PATH: &str = "/api/v1/auth/refresh";
pub const LOGOUT_PATH: &str = "/api/v1/auth/logout";
pub const METRICS_PATH: &str = "/api/v1/metrics/latency";

pub const METRICS_BODY: &str = r#"{
    "timestamp": "2025-02-01T10:00:00",
    "latency_stats": {"mean_ms": 120.0, "p95_ms": 412.5, "p99_ms": 870.0},
    "flow_stats": {"completed": 980, "stalled": 4},
    "anomaly_counts": {"timeouts": 3}
}"#;

/// Configuration pointing both services at the mock server
pub fn config_for(server: &ServerGuard) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.url();
    config.api.metrics_base_url = server.url();
    config.api.metrics_retries = 0;
    config.session.persist = false;
    config
}

pub fn console_with_vault(server: &ServerGuard, vault: Arc<dyn TokenVault>) -> Result<Console> {
    let transport = Arc::new(ReqwestHttpClient::with_timeout(Duration::from_secs(5))?);
    Ok(Console::with_transport(
        config_for(server),
        transport,
        Arc::new(TracingNotifier),
        vault,
    ))
}

pub fn console(server: &ServerGuard) -> Result<Console> {
    console_with_vault(server, Arc::new(EphemeralVault::new()))
}

/// Login endpoint accepting any credentials for user `a`
pub async fn mock_login(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", LOGIN_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"token": "T1", "username": "a", "refresh_token": "R1"}"#)
        .create_async()
        .await
}
