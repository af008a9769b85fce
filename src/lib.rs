pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod events;
pub mod http;
pub mod navigation;
pub mod notify;
pub mod session;
pub mod table;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tracing::info;

// Re-export core components
pub use crate::auth::{AuthGateway, Credentials, LoginForm, TokenVault};
pub use crate::config::{Config, ConfigManager};
pub use crate::error::{AuthError, ConsoleError, ConsoleResult, ErrorCode};
pub use crate::events::{SessionEvent, SessionEvents};
pub use crate::navigation::{Route, RouteState};
pub use crate::notify::{NotificationGateway, NotificationRequest};
pub use crate::session::{LoginOutcome, Session, SessionController, SessionPhase, SessionStore};

use crate::auth::{EphemeralVault, FileVault, HttpAuthGateway};
use crate::dashboard::DataService;
use crate::http::{AuthorizedClient, HttpClient, ReqwestHttpClient, RequestAugmenter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The wired-up console: one session store shared by the controller and
/// every outgoing request.
pub struct Console {
    pub config: Config,
    pub controller: Arc<SessionController>,
    pub data: Arc<DataService>,
    pub routes: Arc<RouteState>,
}

impl Console {
    /// Build the console over a reqwest transport, choosing the vault from
    /// the session settings
    pub fn build(config: Config, notifier: Arc<dyn NotificationGateway>) -> anyhow::Result<Self> {
        let transport = Arc::new(ReqwestHttpClient::with_timeout(config.api.timeout())?);
        let vault: Arc<dyn TokenVault> = if config.session.persist {
            info!(path = %config.session.store_path.display(), "Session persistence enabled");
            Arc::new(FileVault::new(config.session.store_path.clone()))
        } else {
            Arc::new(EphemeralVault::new())
        };
        Ok(Self::with_transport(config, transport, notifier, vault))
    }

    /// Build the console over an explicit transport and vault
    pub fn with_transport(
        config: Config,
        transport: Arc<dyn HttpClient>,
        notifier: Arc<dyn NotificationGateway>,
        vault: Arc<dyn TokenVault>,
    ) -> Self {
        let store = Arc::new(SessionStore::new());
        let client: Arc<dyn HttpClient> = Arc::new(AuthorizedClient::new(
            transport,
            RequestAugmenter::new(store.reader()),
        ));

        let gateway = Arc::new(HttpAuthGateway::new(client.clone(), &config.api.base_url));
        let routes = Arc::new(RouteState::new());
        let controller = Arc::new(SessionController::new(
            store,
            gateway,
            notifier,
            routes.clone(),
            vault,
            events::session_events(),
        ));
        let data = Arc::new(DataService::new(
            client,
            &config.api.metrics_base_url,
            config.api.metrics_retries,
        ));

        Self {
            config,
            controller,
            data,
            routes,
        }
    }
}
