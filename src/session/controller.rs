use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::state::{refresh_applies, Grant, Session, SessionAction, SessionPhase, TransitionCause};
use super::store::{SessionReader, SessionStore, Transition};
use crate::auth::{AuthGateway, Credentials, StoredSession, TokenVault};
use crate::error::{AuthError, ConsoleError, SIGN_IN_FAILED_MESSAGE};
use crate::events::{SessionEvent, SessionEvents, Subscriber};
use crate::navigation::{Navigator, Route};
use crate::notify::{NotificationGateway, NotificationRequest};

pub const SIGNED_IN_TITLE: &str = "Sign-in successful";
pub const SIGNED_IN_MESSAGE: &str = "Welcome to the system!";
pub const SIGN_IN_ERROR_TITLE: &str = "Authentication error";
pub const SIGNED_OUT_TITLE: &str = "Session closed";
pub const SIGNED_OUT_MESSAGE: &str = "You have signed out successfully.";

/// How a login intent resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginOutcome {
    Authenticated { username: String },
    Failed { error: AuthError },
}

/// A side effect owed to the outside world after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Navigate(Route),
    Notify(NotificationRequest),
}

/// Side effects of a transition edge. Edges not listed here have none.
pub fn effects_for(transition: &Transition) -> Vec<Effect> {
    match (transition.cause, transition.to) {
        (TransitionCause::LoginSucceeded, SessionPhase::Authenticated) => vec![
            Effect::Navigate(Route::Home),
            Effect::Notify(NotificationRequest::success(
                SIGNED_IN_TITLE,
                SIGNED_IN_MESSAGE,
            )),
        ],
        (TransitionCause::LoginFailed, SessionPhase::Failed) => {
            vec![Effect::Notify(NotificationRequest::error(
                SIGN_IN_ERROR_TITLE,
                SIGN_IN_FAILED_MESSAGE,
            ))]
        }
        (TransitionCause::LogoutRequested, _) => vec![
            Effect::Navigate(Route::Login),
            Effect::Notify(NotificationRequest::info(
                SIGNED_OUT_TITLE,
                SIGNED_OUT_MESSAGE,
            )),
        ],
        _ => Vec::new(),
    }
}

/// Turns user intents into session transitions and their side effects.
///
/// Holds no session state of its own; the [`SessionStore`] does.
pub struct SessionController {
    store: Arc<SessionStore>,
    gateway: Arc<dyn AuthGateway>,
    notifier: Arc<dyn NotificationGateway>,
    navigator: Arc<dyn Navigator>,
    vault: Arc<dyn TokenVault>,
    events: SessionEvents,
}

impl SessionController {
    pub fn new(
        store: Arc<SessionStore>,
        gateway: Arc<dyn AuthGateway>,
        notifier: Arc<dyn NotificationGateway>,
        navigator: Arc<dyn Navigator>,
        vault: Arc<dyn TokenVault>,
        events: SessionEvents,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            navigator,
            vault,
            events,
        }
    }

    pub fn reader(&self) -> SessionReader {
        self.store.reader()
    }

    pub fn snapshot(&self) -> Session {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> Subscriber<SessionEvent> {
        self.events.subscribe()
    }

    /// Exchange credentials for a session
    pub async fn login(&self, credentials: Credentials) -> LoginOutcome {
        self.apply(SessionAction::LoginRequested).await;
        self.exchange(credentials).await
    }

    /// Like [`SessionController::login`], but refuses with `None` while
    /// another login is still loading.
    pub async fn try_login(&self, credentials: Credentials) -> Option<LoginOutcome> {
        let (transition, _) = self
            .store
            .dispatch_if(SessionAction::LoginRequested, |session| !session.loading)?;
        self.emit(transition).await;
        Some(self.exchange(credentials).await)
    }

    #[instrument(skip_all, fields(username = %credentials.identifier()))]
    async fn exchange(&self, credentials: Credentials) -> LoginOutcome {
        let result = self.gateway.login(&credentials).await;
        drop(credentials);

        match result {
            Ok(response) => {
                let grant = Grant::from(response);
                let username = grant.username.clone();
                self.persist(&grant).await;
                self.apply(SessionAction::LoginSucceeded(grant)).await;
                info!(username = %username, "Signed in");
                LoginOutcome::Authenticated { username }
            }
            Err(error) => {
                warn!(error = %error, "Sign-in failed");
                self.apply(SessionAction::LoginFailed(error.clone())).await;
                LoginOutcome::Failed { error }
            }
        }
    }

    /// Reset the local session, then revoke it remotely on a best-effort
    /// basis. Returns whether the remote call succeeded.
    pub async fn logout(&self) -> bool {
        let refresh_token = self.store.snapshot().refresh_token;

        self.apply(SessionAction::LogoutRequested).await;
        if let Err(e) = self.vault.clear().await {
            warn!(error = %e, "Failed to clear stored session");
        }

        match self.gateway.logout(refresh_token.as_deref()).await {
            Ok(()) => {
                // A login may have started meanwhile; only confirm over an anonymous session.
                if self.store.snapshot().phase() == SessionPhase::Anonymous {
                    self.apply(SessionAction::LogoutConfirmed).await;
                }
                info!("Signed out");
                true
            }
            Err(e) => {
                let e = ConsoleError::from(e);
                warn!(error = %e, "Remote logout failed, local session already cleared");
                false
            }
        }
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// `Ok(false)` when there is nothing to refresh, or when the session that
    /// asked is gone by the time the answer arrives. A failure leaves the
    /// session untouched and shows nothing to the user.
    pub async fn refresh(&self) -> Result<bool, AuthError> {
        let session = self.store.snapshot();
        let refresh_token = match (&session.token, &session.refresh_token, session.loading) {
            (Some(_), Some(refresh_token), false) => refresh_token.clone(),
            _ => {
                debug!(phase = %session.phase(), "Nothing to refresh");
                return Ok(false);
            }
        };

        let refreshed = match self.gateway.refresh(&refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                warn!(error = %e, "Token refresh failed, keeping current session");
                return Err(e);
            }
        };

        let action = SessionAction::TokenRefreshed {
            rotated_from: refresh_token.clone(),
            token: refreshed.access_token,
            refresh_token: refreshed.refresh_token,
        };
        let applied = self
            .store
            .dispatch_if(action, |current| refresh_applies(current, &refresh_token));
        let Some((transition, current)) = applied else {
            debug!("Refresh resolved after its session ended, dropping it");
            return Ok(false);
        };
        self.emit(transition).await;

        if let (Some(username), Some(token)) = (current.username, current.token) {
            self.persist(&Grant {
                username,
                token,
                refresh_token: current.refresh_token,
            })
            .await;
        }
        debug!(to = %transition.to, expires_in = ?refreshed.expires_in, "Token refreshed");
        Ok(true)
    }

    /// Bring back a stored session, if there is a valid one. Shows nothing
    /// and navigates nowhere.
    pub async fn restore(&self) -> bool {
        if self.store.snapshot().phase() != SessionPhase::Anonymous {
            return false;
        }

        match self.vault.load().await {
            Ok(Some(stored)) => {
                let username = stored.username.clone();
                self.apply(SessionAction::Restored(stored.into_grant())).await;
                info!(username = %username, "Restored stored session");
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Discarding unusable stored session");
                if let Err(e) = self.vault.clear().await {
                    warn!(error = %e, "Failed to remove unusable stored session");
                }
                false
            }
        }
    }

    async fn apply(&self, action: SessionAction) {
        let transition = self.store.dispatch(action);
        self.emit(transition).await;
    }

    /// Publish a transition and run the effects of its edge
    async fn emit(&self, transition: Transition) {
        self.events
            .publish(SessionEvent::transitioned(transition))
            .await;

        for effect in effects_for(&transition) {
            match effect {
                Effect::Navigate(route) => {
                    self.navigator.navigate(route);
                    self.events.publish(SessionEvent::navigated(route)).await;
                }
                Effect::Notify(request) => {
                    // Nobody waits for the answer to session notifications.
                    drop(self.notifier.present(request));
                }
            }
        }
    }

    async fn persist(&self, grant: &Grant) {
        if let Err(e) = self.vault.save(&StoredSession::from_grant(grant)).await {
            warn!(error = %e, "Failed to store session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationKind;

    fn edge(from: SessionPhase, to: SessionPhase, cause: TransitionCause) -> Transition {
        Transition { from, to, cause }
    }

    #[test]
    fn success_edge_navigates_then_notifies() {
        let effects = effects_for(&edge(
            SessionPhase::Authenticating,
            SessionPhase::Authenticated,
            TransitionCause::LoginSucceeded,
        ));

        assert_eq!(effects.len(), 2);
        assert_eq!(effects[0], Effect::Navigate(Route::Home));
        assert!(matches!(
            &effects[1],
            Effect::Notify(request) if request.kind == NotificationKind::Success
        ));
    }

    #[test]
    fn failure_edge_shows_fixed_message() {
        let effects = effects_for(&edge(
            SessionPhase::Authenticating,
            SessionPhase::Failed,
            TransitionCause::LoginFailed,
        ));

        match effects.as_slice() {
            [Effect::Notify(request)] => {
                assert_eq!(request.kind, NotificationKind::Error);
                assert_eq!(request.message, SIGN_IN_FAILED_MESSAGE);
            }
            other => panic!("unexpected effects: {:?}", other),
        }
    }

    #[test]
    fn silent_edges_have_no_effects() {
        for cause in [
            TransitionCause::LoginRequested,
            TransitionCause::Restored,
            TransitionCause::TokenRefreshed,
            TransitionCause::LogoutConfirmed,
        ] {
            let to = match cause {
                TransitionCause::LoginRequested => SessionPhase::Authenticating,
                TransitionCause::LogoutConfirmed => SessionPhase::Anonymous,
                _ => SessionPhase::Authenticated,
            };
            assert!(effects_for(&edge(SessionPhase::Anonymous, to, cause)).is_empty());
        }
    }

    #[test]
    fn logout_edge_from_any_phase() {
        for from in [
            SessionPhase::Anonymous,
            SessionPhase::Authenticating,
            SessionPhase::Authenticated,
            SessionPhase::Failed,
        ] {
            let effects = effects_for(&edge(
                from,
                SessionPhase::Anonymous,
                TransitionCause::LogoutRequested,
            ));
            assert_eq!(effects[0], Effect::Navigate(Route::Login));
        }
    }
}
