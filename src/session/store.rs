use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use super::state::{reduce, Session, SessionAction, SessionPhase, TransitionCause};
use crate::error::AuthError;

/// One resolved edge of the session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: SessionPhase,
    pub to: SessionPhase,
    pub cause: TransitionCause,
}

/// Sole owner and mutator of the [`Session`].
///
/// Readers never get the store itself, only a [`SessionReader`].
pub struct SessionStore {
    sender: watch::Sender<Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Session::default());
        Self { sender }
    }

    /// Apply an action and wake every reader whose projection changed
    pub fn dispatch(&self, action: SessionAction) -> Transition {
        let mut transition = Transition {
            from: SessionPhase::Anonymous,
            to: SessionPhase::Anonymous,
            cause: action.cause(),
        };
        self.sender.send_modify(|session| {
            transition.from = session.phase();
            *session = reduce(session, action);
            transition.to = session.phase();
        });
        log_transition(&transition);
        transition
    }

    /// Apply an action only if `guard` holds for the session it would replace.
    ///
    /// The check and the write happen under the same lock. Returns the edge and
    /// the resulting session, or `None` when the guard refused.
    pub fn dispatch_if(
        &self,
        action: SessionAction,
        guard: impl FnOnce(&Session) -> bool,
    ) -> Option<(Transition, Session)> {
        let cause = action.cause();
        let mut applied = None;
        self.sender.send_if_modified(|session| {
            if !guard(session) {
                return false;
            }
            let from = session.phase();
            *session = reduce(session, action);
            let transition = Transition {
                from,
                to: session.phase(),
                cause,
            };
            applied = Some((transition, session.clone()));
            true
        });

        match &applied {
            Some((transition, _)) => log_transition(transition),
            None => debug!(cause = ?cause, "Session action refused"),
        }
        applied
    }

    pub fn snapshot(&self) -> Session {
        self.sender.borrow().clone()
    }

    pub fn reader(&self) -> SessionReader {
        SessionReader {
            receiver: self.sender.subscribe(),
        }
    }
}

fn log_transition(transition: &Transition) {
    debug!(
        from = %transition.from,
        to = %transition.to,
        cause = ?transition.cause,
        "Session transition"
    );
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only handle onto the session
#[derive(Clone)]
pub struct SessionReader {
    receiver: watch::Receiver<Session>,
}

impl SessionReader {
    pub fn snapshot(&self) -> Session {
        self.receiver.borrow().clone()
    }

    /// Current token without waiting for anything
    pub fn token(&self) -> Option<String> {
        self.receiver.borrow().token.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.receiver.borrow().phase()
    }

    pub fn select<T>(&self, project: fn(&Session) -> T) -> Selector<T>
    where
        T: Clone + PartialEq,
    {
        let last = project(&self.receiver.borrow());
        Selector {
            receiver: self.receiver.clone(),
            project,
            last,
        }
    }

    pub fn token_selector(&self) -> Selector<Option<String>> {
        self.select(|session| session.token.clone())
    }

    pub fn username_selector(&self) -> Selector<Option<String>> {
        self.select(|session| session.username.clone())
    }

    pub fn loading_selector(&self) -> Selector<bool> {
        self.select(|session| session.loading)
    }

    pub fn error_selector(&self) -> Selector<Option<AuthError>> {
        self.select(|session| session.error.clone())
    }
}

/// A projection of the session that only wakes on changes of its own value
pub struct Selector<T> {
    receiver: watch::Receiver<Session>,
    project: fn(&Session) -> T,
    last: T,
}

impl<T: Clone + PartialEq> Selector<T> {
    pub fn get(&self) -> T {
        (self.project)(&self.receiver.borrow())
    }

    /// Wait until the projected value differs from the last one observed.
    /// Returns `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<T> {
        loop {
            self.receiver.changed().await.ok()?;
            let value = (self.project)(&self.receiver.borrow_and_update());
            if value != self.last {
                self.last = value.clone();
                return Some(value);
            }
        }
    }
}
