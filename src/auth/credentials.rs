use serde::Serialize;
use std::fmt;

/// A username/password pair, alive only for the login call that uses it.
///
/// Serialized as `{"username": .., "password": ..}`. The password never
/// shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    #[serde(rename = "username")]
    identifier: String,
    #[serde(rename = "password")]
    secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Login form state as typed by the user
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub identifier: String,
    pub secret: String,
}

impl LoginForm {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Both fields are filled in. Whitespace counts as content.
    pub fn is_valid(&self) -> bool {
        !self.identifier.is_empty() && !self.secret.is_empty()
    }

    /// Credentials to submit, or `None` when the form is incomplete or a
    /// login is already in flight
    pub fn submit(&self, loading: bool) -> Option<Credentials> {
        if loading || !self.is_valid() {
            return None;
        }
        Some(Credentials::new(&self.identifier, &self.secret))
    }
}
