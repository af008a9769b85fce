use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const DEFAULT_CONFIRM_LABEL: &str = "Accept";
pub const DEFAULT_CANCEL_LABEL: &str = "Cancel";
pub const CONFIRMATION_LABEL: &str = "Confirm";

/// Intent and visual style of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

/// A single user-facing notification, consumed once by a gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: Option<String>,
    pub show_cancel: bool,
}

impl NotificationRequest {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            title: title.into(),
            message: message.into(),
            confirm_label: DEFAULT_CONFIRM_LABEL.to_string(),
            cancel_label: Some(DEFAULT_CANCEL_LABEL.to_string()),
            show_cancel: false,
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, title, message)
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            show_cancel: true,
            ..Self::new(NotificationKind::Warning, title, message)
        }
    }

    /// Yes/no question, styled as info
    pub fn confirmation(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            confirm_label: CONFIRMATION_LABEL.to_string(),
            show_cancel: true,
            ..Self::new(NotificationKind::Info, title, message)
        }
    }
}

/// The user's answer to a presented notification.
///
/// Resolves to `true` when confirmed, `false` when cancelled or dismissed.
pub struct Acknowledgement {
    receiver: oneshot::Receiver<bool>,
}

impl Acknowledgement {
    pub fn pending() -> (oneshot::Sender<bool>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { receiver })
    }

    /// Already answered
    pub fn resolved(confirmed: bool) -> Self {
        let (sender, ack) = Self::pending();
        let _ = sender.send(confirmed);
        ack
    }

    pub async fn confirmed(self) -> bool {
        self.receiver.await.unwrap_or(false)
    }
}

/// Presents notifications to the user
pub trait NotificationGateway: Send + Sync {
    fn present(&self, request: NotificationRequest) -> Acknowledgement;
}

/// Writes notifications to the log and confirms them immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationGateway for TracingNotifier {
    fn present(&self, request: NotificationRequest) -> Acknowledgement {
        match request.kind {
            NotificationKind::Error => {
                error!(title = %request.title, message = %request.message, "Notification")
            }
            NotificationKind::Warning => {
                warn!(title = %request.title, message = %request.message, "Notification")
            }
            NotificationKind::Success | NotificationKind::Info => {
                info!(title = %request.title, message = %request.message, "Notification")
            }
        }
        Acknowledgement::resolved(true)
    }
}

/// A notification waiting for the UI host to answer it
#[derive(Debug)]
pub struct PendingNotification {
    pub request: NotificationRequest,
    responder: oneshot::Sender<bool>,
}

impl PendingNotification {
    pub fn respond(self, confirmed: bool) {
        // The presenter may have stopped waiting; nothing to do then.
        let _ = self.responder.send(confirmed);
    }
}

/// Notifications a [`QueuedNotifier`] holds before it starts dropping new ones
pub const DEFAULT_INBOX_CAPACITY: usize = 64;

/// Hands notifications to a UI host through a bounded channel
#[derive(Clone)]
pub struct QueuedNotifier {
    sender: mpsc::Sender<PendingNotification>,
}

/// Receiving side of a [`QueuedNotifier`]
pub struct NotificationInbox {
    receiver: mpsc::Receiver<PendingNotification>,
}

impl QueuedNotifier {
    pub fn new() -> (Self, NotificationInbox) {
        Self::with_capacity(DEFAULT_INBOX_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, NotificationInbox) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, NotificationInbox { receiver })
    }
}

impl NotificationGateway for QueuedNotifier {
    /// A notification that finds the inbox full or closed is dropped and
    /// acknowledges `false`.
    fn present(&self, request: NotificationRequest) -> Acknowledgement {
        let (responder, ack) = Acknowledgement::pending();
        match self.sender.try_send(PendingNotification { request, responder }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(title = %dropped.request.title, "Notification inbox full, dropping notification");
            }
            Err(mpsc::error::TrySendError::Closed(dropped)) => {
                warn!(title = %dropped.request.title, "Notification inbox closed, dropping notification");
            }
        }
        ack
    }
}

impl NotificationInbox {
    pub async fn recv(&mut self) -> Option<PendingNotification> {
        self.receiver.recv().await
    }

    /// Every notification queued so far, without waiting
    pub fn drain(&mut self) -> Vec<PendingNotification> {
        let mut pending = Vec::new();
        while let Ok(notification) = self.receiver.try_recv() {
            pending.push(notification);
        }
        pending
    }
}
