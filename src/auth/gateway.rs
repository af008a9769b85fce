use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::credentials::Credentials;
use crate::error::AuthError;
use crate::http::{ApiRequest, HttpClient};
use crate::session::state::Grant;

/// Body of a successful login.
///
/// The service has been seen returning numeric usernames; every field is
/// kept as text, non-string JSON values rendered with their JSON text.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawLoginResponse")]
pub struct LoginResponse {
    pub username: String,
    pub token: String,
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct RawLoginResponse {
    username: Option<Value>,
    token: Option<Value>,
    refresh_token: Option<Value>,
}

fn as_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

impl TryFrom<RawLoginResponse> for LoginResponse {
    type Error = String;

    fn try_from(raw: RawLoginResponse) -> Result<Self, Self::Error> {
        let token = raw.token.ok_or("login response has no token")?;
        let username = raw.username.ok_or("login response has no username")?;
        Ok(Self {
            username: as_text(username),
            token: as_text(token),
            refresh_token: raw.refresh_token.map(as_text),
        })
    }
}

impl From<LoginResponse> for Grant {
    fn from(response: LoginResponse) -> Self {
        Grant {
            username: response.username,
            token: response.token,
            refresh_token: response.refresh_token,
        }
    }
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("username", &self.username)
            .field("refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Body of a successful refresh
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshResponse {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl fmt::Debug for RefreshResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshResponse")
            .field("refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct RefreshTokenBody<'a> {
    refresh_token: Option<&'a str>,
}

/// Calls against the remote authentication service. No method retries.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AuthError>;

    /// Revoke the refresh token server-side, if there is one
    async fn logout(&self, refresh_token: Option<&str>) -> Result<(), AuthError>;
}

/// [`AuthGateway`] over plain REST/JSON
pub struct HttpAuthGateway {
    client: Arc<dyn HttpClient>,
    base_url: String,
}

impl HttpAuthGateway {
    pub fn new(client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/api/v1/auth/{}", self.base_url, action)
    }
}

#[async_trait]
impl AuthGateway for HttpAuthGateway {
    #[instrument(skip_all, fields(username = %credentials.identifier()))]
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError> {
        let request = ApiRequest::post_json(self.endpoint("login"), credentials)
            .map_err(|e| AuthError::malformed(e.to_string()))?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.is_success() {
            warn!(status = response.status(), "Login rejected");
            return Err(AuthError::rejected(response.status(), response.body()));
        }

        let login: LoginResponse = response
            .json()
            .map_err(|e| AuthError::malformed(e.to_string()))?;
        info!("Login accepted");
        Ok(login)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse, AuthError> {
        let body = RefreshTokenBody {
            refresh_token: Some(refresh_token),
        };
        let request = ApiRequest::post_json(self.endpoint("refresh"), &body)
            .map_err(|e| AuthError::Refresh(e.to_string()))?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| AuthError::Refresh(e.to_string()))?;

        if !response.is_success() {
            return Err(AuthError::Refresh(format!(
                "status {}: {}",
                response.status(),
                response.body()
            )));
        }

        let refreshed: RefreshResponse = response
            .json()
            .map_err(|e| AuthError::Refresh(e.to_string()))?;
        debug!(rotated = refreshed.refresh_token.is_some(), "Token refreshed");
        Ok(refreshed)
    }

    async fn logout(&self, refresh_token: Option<&str>) -> Result<(), AuthError> {
        let body = RefreshTokenBody { refresh_token };
        let request = ApiRequest::post_json(self.endpoint("logout"), &body)
            .map_err(|e| AuthError::LogoutTransport(e.to_string()))?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| AuthError::LogoutTransport(e.to_string()))?;

        if !response.is_success() {
            return Err(AuthError::LogoutTransport(format!(
                "status {}",
                response.status()
            )));
        }
        Ok(())
    }
}
