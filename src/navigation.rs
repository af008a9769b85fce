use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;
use tracing::debug;

use crate::session::Session;

/// Views of the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    Home,
    Transactions,
    SecuCheck,
    MidFlow,
    CoreBank,
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Login,
        Route::Home,
        Route::Transactions,
        Route::SecuCheck,
        Route::MidFlow,
        Route::CoreBank,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/",
            Route::Home => "/app/inicio",
            Route::Transactions => "/app/individual",
            Route::SecuCheck => "/app/secuCheck",
            Route::MidFlow => "/app/midFlow",
            Route::CoreBank => "/app/coreBank",
        }
    }

    /// Resolve a URL path, applying redirects: `/app` and unknown pages
    /// under it land on Home, anything else outside lands on Login.
    pub fn parse(path: &str) -> Route {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');

        if let Some(route) = Route::ALL
            .iter()
            .copied()
            .find(|route| route.path().trim_end_matches('/') == trimmed)
        {
            return route;
        }

        if trimmed == "/app" || trimmed.starts_with("/app/") {
            Route::Home
        } else {
            Route::Login
        }
    }

    /// Pages that need a signed-in session
    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Login)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Where a requested route actually leads for the given session
pub fn guard(route: Route, session: &Session) -> Route {
    if route.is_protected() && !session.is_authenticated() {
        Route::Login
    } else {
        route
    }
}

/// Moves the UI between views
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);

    fn current(&self) -> Route;
}

/// Navigator that only records the current route, for hosts to watch
pub struct RouteState {
    sender: watch::Sender<Route>,
}

impl RouteState {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Route::Login);
        Self { sender }
    }

    pub fn watch(&self) -> watch::Receiver<Route> {
        self.sender.subscribe()
    }
}

impl Default for RouteState {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for RouteState {
    fn navigate(&self, route: Route) {
        debug!(route = %route, "Navigating");
        self.sender.send_replace(route);
    }

    fn current(&self) -> Route {
        *self.sender.borrow()
    }
}
