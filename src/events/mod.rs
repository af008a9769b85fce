use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod streams;
pub use streams::{EventLabel, EventStream, EventStreamStats, Subscriber};

use crate::navigation::Route;
use crate::session::{SessionPhase, Transition, TransitionCause};

pub const EVENT_STREAM_CAPACITY: usize = 256;
pub const EVENT_BUFFER_SIZE: usize = 64;

/// What the session controller reports to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Transitioned {
        from: SessionPhase,
        to: SessionPhase,
        cause: TransitionCause,
        at: DateTime<Utc>,
    },
    Navigated {
        route: Route,
        at: DateTime<Utc>,
    },
}

impl SessionEvent {
    pub fn transitioned(transition: Transition) -> Self {
        SessionEvent::Transitioned {
            from: transition.from,
            to: transition.to,
            cause: transition.cause,
            at: Utc::now(),
        }
    }

    pub fn navigated(route: Route) -> Self {
        SessionEvent::Navigated {
            route,
            at: Utc::now(),
        }
    }
}

impl EventLabel for SessionEvent {
    fn label(&self) -> &'static str {
        match self {
            SessionEvent::Transitioned { .. } => "session.transitioned",
            SessionEvent::Navigated { .. } => "session.navigated",
        }
    }
}

/// Stream the controller publishes on
pub type SessionEvents = EventStream<SessionEvent>;

pub fn session_events() -> SessionEvents {
    EventStream::new(EVENT_STREAM_CAPACITY, EVENT_BUFFER_SIZE)
}
