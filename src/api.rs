use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, MutexGuard};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::LoginForm;
use crate::config::TableDefaults;
use crate::dashboard::{DataService, MetricRow, MetricSection, MetricsResponse};
use crate::error::{ConsoleError, ErrorCategory};
use crate::navigation::{guard, Navigator, Route, RouteState};
use crate::notify::{NotificationInbox, NotificationRequest, PendingNotification};
use crate::session::{LoginOutcome, Session, SessionController, SessionPhase};
use crate::table::{
    page_slice, render, ColumnDefinition, PageWindow, SelectionModel, TableConfig, TableDisplay,
};
use crate::Console;

/// Response envelope shared by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

fn success<T>(data: T) -> Reply<T> {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }),
    )
}

fn failure<T>(status: StatusCode, error: impl Into<String>) -> Reply<T> {
    (
        status,
        Json(ApiResponse {
            success: false,
            data: None,
            error: Some(error.into()),
        }),
    )
}

fn upstream_failure<T>(error: &ConsoleError) -> Reply<T> {
    warn!(error = %error, "Upstream request failed");
    let status = match error.category {
        Some(ErrorCategory::Authentication) => StatusCode::UNAUTHORIZED,
        Some(ErrorCategory::NotFound) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    };
    failure(status, error.message.clone())
}

/// Unanswered notifications kept for the browser; older ones are dropped first
const MAX_PENDING_NOTIFICATIONS: usize = crate::notify::DEFAULT_INBOX_CAPACITY;

/// Notifications waiting for the browser to show and answer them
pub struct NotificationDesk {
    inbox: Mutex<NotificationInbox>,
    pending: Mutex<Vec<PendingNotification>>,
}

impl NotificationDesk {
    pub fn new(inbox: NotificationInbox) -> Self {
        Self {
            inbox: Mutex::new(inbox),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Pull queued notifications in, dropping the oldest beyond the cap.
    /// A dropped notification acknowledges `false`.
    async fn collect(&self) -> MutexGuard<'_, Vec<PendingNotification>> {
        let fresh = self.inbox.lock().await.drain();
        let mut pending = self.pending.lock().await;
        pending.extend(fresh);
        if pending.len() > MAX_PENDING_NOTIFICATIONS {
            let excess = pending.len() - MAX_PENDING_NOTIFICATIONS;
            debug!(dropped = excess, "Dropping unanswered notifications");
            pending.drain(..excess);
        }
        pending
    }

    /// Every unanswered notification, oldest first
    async fn outstanding(&self) -> Vec<NotificationRequest> {
        self.collect()
            .await
            .iter()
            .map(|p| p.request.clone())
            .collect()
    }

    async fn answer(&self, id: Uuid, confirmed: bool) -> bool {
        let mut pending = self.collect().await;
        match pending.iter().position(|p| p.request.id == id) {
            Some(index) => {
                pending.remove(index).respond(confirmed);
                true
            }
            None => false,
        }
    }
}

/// Shared state of the shell API
#[derive(Clone)]
pub struct ShellState {
    controller: Arc<SessionController>,
    data: Arc<DataService>,
    routes: Arc<RouteState>,
    table: TableDefaults,
    notifications: Option<Arc<NotificationDesk>>,
}

impl ShellState {
    pub fn new(console: &Console) -> Self {
        Self {
            controller: console.controller.clone(),
            data: console.data.clone(),
            routes: console.routes.clone(),
            table: console.config.table.clone(),
            notifications: None,
        }
    }

    /// Serve notifications queued by a [`crate::notify::QueuedNotifier`]
    pub fn with_inbox(mut self, inbox: NotificationInbox) -> Self {
        self.notifications = Some(Arc::new(NotificationDesk::new(inbox)));
        self
    }
}

/// What the browser needs to know about the session. Tokens stay server-side.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub username: Option<String>,
    pub loading: bool,
    pub authenticated: bool,
    pub error: Option<&'static str>,
    pub route: &'static str,
}

impl SessionView {
    fn of(session: &Session, route: Route) -> Self {
        Self {
            phase: session.phase(),
            username: session.username.clone(),
            loading: session.loading,
            authenticated: session.is_authenticated(),
            error: session.error.as_ref().map(|e| e.user_message()),
            route: route.path(),
        }
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize)]
struct LogoutView {
    remote_revoked: bool,
}

#[derive(Debug, Deserialize)]
struct RouteRequest {
    path: String,
}

#[derive(Debug, Serialize)]
struct RouteView {
    path: &'static str,
    redirected: bool,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<usize>,
    size: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct AnswerRequest {
    confirmed: bool,
}

/// Build the router for the shell API
pub fn router(state: ShellState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/login", post(login))
        .route("/api/session/logout", post(logout))
        .route("/api/session/refresh", post(refresh))
        .route("/api/route", get(get_route).post(navigate))
        .route("/api/metrics", get(get_metrics))
        .route("/api/metrics/:section", get(get_metric_table))
        .route("/api/notifications", get(get_notifications))
        .route("/api/notifications/:id", post(answer_notification))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Serve the shell API on loopback until `shutdown` resolves
pub async fn serve(
    state: ShellState,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Shell API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn get_session(State(state): State<ShellState>) -> Reply<SessionView> {
    let session = state.controller.snapshot();
    success(SessionView::of(&session, state.routes.current()))
}

async fn login(
    State(state): State<ShellState>,
    Json(request): Json<LoginRequest>,
) -> Reply<SessionView> {
    let form = LoginForm::new(request.username, request.password);
    if !form.is_valid() {
        return failure(StatusCode::BAD_REQUEST, "Username and password are required");
    }
    let credentials = match form.submit(state.controller.snapshot().loading) {
        Some(credentials) => credentials,
        None => return failure(StatusCode::CONFLICT, "A sign-in is already in progress"),
    };

    let Some(outcome) = state.controller.try_login(credentials).await else {
        return failure(StatusCode::CONFLICT, "A sign-in is already in progress");
    };
    let session = state.controller.snapshot();
    match outcome {
        LoginOutcome::Authenticated { .. } => {
            success(SessionView::of(&session, state.routes.current()))
        }
        LoginOutcome::Failed { error } => failure(StatusCode::UNAUTHORIZED, error.user_message()),
    }
}

async fn logout(State(state): State<ShellState>) -> Reply<LogoutView> {
    let remote_revoked = state.controller.logout().await;
    success(LogoutView { remote_revoked })
}

async fn refresh(State(state): State<ShellState>) -> Reply<SessionView> {
    match state.controller.refresh().await {
        Ok(true) => {
            let session = state.controller.snapshot();
            success(SessionView::of(&session, state.routes.current()))
        }
        Ok(false) => failure(StatusCode::CONFLICT, "There is no session to refresh"),
        Err(e) => upstream_failure(&ConsoleError::from(e)),
    }
}

async fn get_route(State(state): State<ShellState>) -> Reply<RouteView> {
    success(RouteView {
        path: state.routes.current().path(),
        redirected: false,
    })
}

async fn navigate(
    State(state): State<ShellState>,
    Json(request): Json<RouteRequest>,
) -> Reply<RouteView> {
    let requested = Route::parse(&request.path);
    let target = guard(requested, &state.controller.snapshot());
    state.routes.navigate(target);

    success(RouteView {
        path: target.path(),
        redirected: target != requested,
    })
}

async fn get_metrics(State(state): State<ShellState>) -> Reply<MetricsResponse> {
    if !state.controller.snapshot().is_authenticated() {
        return failure(StatusCode::UNAUTHORIZED, "Sign in to view metrics");
    }
    match state.data.latency_metrics().await {
        Ok(metrics) => success(metrics),
        Err(e) => upstream_failure(&e),
    }
}

/// One statistics section, paged and rendered as a table
async fn get_metric_table(
    State(state): State<ShellState>,
    Path(section): Path<String>,
    Query(query): Query<PageQuery>,
) -> Reply<TableDisplay> {
    let section = match section.parse::<MetricSection>() {
        Ok(section) => section,
        Err(e) => return failure(StatusCode::BAD_REQUEST, e),
    };
    if !state.controller.snapshot().is_authenticated() {
        return failure(StatusCode::UNAUTHORIZED, "Sign in to view metrics");
    }

    let metrics = match state.data.latency_metrics().await {
        Ok(metrics) => metrics,
        Err(e) => return upstream_failure(&e),
    };

    let rows = metrics.rows(section);
    let window = PageWindow::new(
        query.page.unwrap_or(0),
        query.size.unwrap_or(state.table.default_page_size),
        rows.len(),
    );
    let columns = vec![
        ColumnDefinition::<MetricRow>::new("metric", "Metric").sortable(),
        ColumnDefinition::new("value", "Value"),
    ];
    let config = TableConfig {
        page_size_options: state.table.page_size_options.clone(),
        ..TableConfig::default()
    };
    debug!(section = ?section, page = window.page_index, "Rendering metric table");

    success(render(
        &columns,
        page_slice(&rows, window),
        window,
        &config,
        &SelectionModel::new(),
    ))
}

async fn get_notifications(State(state): State<ShellState>) -> Reply<Vec<NotificationRequest>> {
    match &state.notifications {
        Some(desk) => success(desk.outstanding().await),
        None => success(Vec::new()),
    }
}

async fn answer_notification(
    State(state): State<ShellState>,
    Path(id): Path<Uuid>,
    Json(answer): Json<AnswerRequest>,
) -> Reply<bool> {
    let Some(desk) = &state.notifications else {
        return failure(StatusCode::NOT_FOUND, "Notifications are not queued");
    };
    if desk.answer(id, answer.confirmed).await {
        success(answer.confirmed)
    } else {
        failure(StatusCode::NOT_FOUND, format!("No pending notification {}", id))
    }
}
