pub mod controller;
pub mod state;
pub mod store;

pub use controller::{LoginOutcome, SessionController};
pub use state::{Grant, Session, SessionAction, SessionPhase, TransitionCause};
pub use store::{SessionReader, SessionStore, Selector, Transition};
