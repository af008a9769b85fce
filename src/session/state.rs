use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AuthError;

/// Coarse authentication phase, derived from a [`Session`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No token held
    Anonymous,
    /// A login intent is in flight
    Authenticating,
    /// A token is held
    Authenticated,
    /// The last login attempt failed
    Failed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Anonymous => "anonymous",
            SessionPhase::Authenticating => "authenticating",
            SessionPhase::Authenticated => "authenticated",
            SessionPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The single process-wide authentication state.
///
/// Only [`reduce`] produces new values; everything else reads snapshots.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub username: Option<String>,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub loading: bool,
    pub error: Option<AuthError>,
}

impl Session {
    pub fn phase(&self) -> SessionPhase {
        if self.loading {
            SessionPhase::Authenticating
        } else if self.token.is_some() {
            SessionPhase::Authenticated
        } else if self.error.is_some() {
            SessionPhase::Failed
        } else {
            SessionPhase::Anonymous
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

// Tokens never reach log output.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("loading", &self.loading)
            .field("error", &self.error)
            .finish()
    }
}

/// Identity returned by a successful credential exchange or a restore
#[derive(Clone, PartialEq, Eq)]
pub struct Grant {
    pub username: String,
    pub token: String,
    pub refresh_token: Option<String>,
}

impl fmt::Debug for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grant")
            .field("username", &self.username)
            .field("refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Every way the session can change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    LoginRequested,
    LoginSucceeded(Grant),
    LoginFailed(AuthError),
    /// New tokens obtained by exchanging `rotated_from`
    TokenRefreshed {
        rotated_from: String,
        token: String,
        refresh_token: Option<String>,
    },
    Restored(Grant),
    LogoutRequested,
    LogoutConfirmed,
}

/// Name of the action that caused a transition, safe to log and publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    LoginRequested,
    LoginSucceeded,
    LoginFailed,
    TokenRefreshed,
    Restored,
    LogoutRequested,
    LogoutConfirmed,
}

impl SessionAction {
    pub fn cause(&self) -> TransitionCause {
        match self {
            SessionAction::LoginRequested => TransitionCause::LoginRequested,
            SessionAction::LoginSucceeded(_) => TransitionCause::LoginSucceeded,
            SessionAction::LoginFailed(_) => TransitionCause::LoginFailed,
            SessionAction::TokenRefreshed { .. } => TransitionCause::TokenRefreshed,
            SessionAction::Restored(_) => TransitionCause::Restored,
            SessionAction::LogoutRequested => TransitionCause::LogoutRequested,
            SessionAction::LogoutConfirmed => TransitionCause::LogoutConfirmed,
        }
    }
}

/// Whether tokens obtained with `rotated_from` still belong to `session`
pub fn refresh_applies(session: &Session, rotated_from: &str) -> bool {
    session.is_authenticated()
        && !session.loading
        && session.refresh_token.as_deref() == Some(rotated_from)
}

/// The transition function. Pure: the next session depends only on the
/// current one and the action.
pub fn reduce(session: &Session, action: SessionAction) -> Session {
    match action {
        SessionAction::LoginRequested => Session {
            loading: true,
            error: None,
            ..session.clone()
        },
        SessionAction::LoginSucceeded(grant) | SessionAction::Restored(grant) => Session {
            username: Some(grant.username),
            token: Some(grant.token),
            refresh_token: grant.refresh_token,
            loading: false,
            error: None,
        },
        SessionAction::LoginFailed(error) => Session {
            username: None,
            token: None,
            refresh_token: None,
            loading: false,
            error: Some(error),
        },
        SessionAction::TokenRefreshed {
            rotated_from,
            token,
            refresh_token,
        } => {
            // Only the session that issued the refresh may take its result.
            if !refresh_applies(session, &rotated_from) {
                return session.clone();
            }
            Session {
                token: Some(token),
                refresh_token: refresh_token.or(Some(rotated_from)),
                ..session.clone()
            }
        }
        SessionAction::LogoutRequested | SessionAction::LogoutConfirmed => Session::default(),
    }
}
