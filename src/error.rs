use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Message shown to the user for every failed sign-in, whatever the cause.
pub const SIGN_IN_FAILED_MESSAGE: &str = "Could not sign in. Please verify your credentials.";

/// Structured error type for the LogView360 console
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleError {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional context for additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Severity level
    pub severity: ErrorSeverity,
    /// Error category used to decide whether a retry makes sense
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
}

/// Result alias used by console operations that surface structured errors
pub type ConsoleResult<T> = Result<T, ConsoleError>;

impl ConsoleError {
    /// Create a new error builder with the specified error code
    pub fn new(code: ErrorCode) -> ConsoleErrorBuilder {
        ConsoleErrorBuilder {
            code,
            message: String::new(),
            context: None,
            severity: ErrorSeverity::Error,
            category: None,
        }
    }

    /// Whether an operation failing with this error may be attempted again
    pub fn is_retryable(&self) -> bool {
        self.category.is_some_and(|c| c.is_retryable())
    }
}

/// Builder for creating ConsoleError instances
pub struct ConsoleErrorBuilder {
    code: ErrorCode,
    message: String,
    context: Option<String>,
    severity: ErrorSeverity,
    category: Option<ErrorCategory>,
}

impl ConsoleErrorBuilder {
    /// Set the error message
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the error context
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the error severity
    pub fn severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Set the error category
    pub fn category(mut self, category: ErrorCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Build the final ConsoleError
    pub fn build(self) -> ConsoleError {
        ConsoleError {
            code: self.code,
            message: self.message,
            context: self.context,
            severity: self.severity,
            category: self.category,
        }
    }
}

/// Error codes for different types of errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // General errors
    Internal,

    // Authentication errors
    AuthenticationFailed,
    AuthRefreshFailed,
    AuthLogoutFailed,

    // API errors
    ApiRequestFailed,
    ApiResponseInvalid,
    ApiNotFound,

    // Network errors
    NetworkFailure,

    // Configuration related errors
    ConfigInvalid,
}

/// Error variants raised inside the console, converted into [`ConsoleError`]
#[derive(Error, Debug, Clone)]
pub enum ConsoleErrorType {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Request to {url} failed with status {status}")]
    ApiRequestFailed { url: String, status: u16 },

    #[error("Response from {url} could not be decoded: {reason}")]
    ApiResponseInvalid { url: String, reason: String },

    #[error("Resource {url} was not found")]
    ApiNotFound { url: String },

    #[error("Network failure while calling {url}: {reason}")]
    NetworkFailure { url: String, reason: String },

    #[error("Invalid configuration value for '{key}': {reason}")]
    ConfigInvalid { key: String, reason: String },
}

/// Failures of the remote authentication service.
///
/// The payload of each variant is diagnostic detail for logs. It is never shown
/// to the user; [`AuthError::user_message`] is.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthError {
    /// Credentials rejected, non-2xx status or malformed login response
    #[error("authentication failed (status {status:?}): {detail}")]
    Authentication { status: Option<u16>, detail: String },

    /// Transport-level failure reaching the authentication service
    #[error("network failure: {0}")]
    Network(String),

    /// Token refresh did not succeed
    #[error("token refresh failed: {0}")]
    Refresh(String),

    /// The remote logout call failed; the local session is reset anyway
    #[error("remote logout failed: {0}")]
    LogoutTransport(String),
}

impl AuthError {
    /// Build an authentication error from an HTTP status and body
    pub fn rejected(status: u16, detail: impl Into<String>) -> Self {
        AuthError::Authentication {
            status: Some(status),
            detail: detail.into(),
        }
    }

    /// Build an authentication error for a body that could not be decoded
    pub fn malformed(detail: impl Into<String>) -> Self {
        AuthError::Authentication {
            status: None,
            detail: detail.into(),
        }
    }

    /// Fixed, non-revealing message presented to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::Authentication { .. } | AuthError::Network(_) => SIGN_IN_FAILED_MESSAGE,
            AuthError::Refresh(_) => "Your session could not be renewed.",
            AuthError::LogoutTransport(_) => "You have been signed out.",
        }
    }

    /// Category used for logging and retry decisions
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuthError::Authentication { .. } | AuthError::Refresh(_) => {
                ErrorCategory::Authentication
            }
            AuthError::Network(_) | AuthError::LogoutTransport(_) => ErrorCategory::Network,
        }
    }
}

/// Errors raised by session persistence backends
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("session file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("session file integrity check failed")]
    Tampered,
}

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    /// Informational messages that don't impact functionality
    Info,
    /// Warnings that might impact functionality but don't stop operation
    Warning,
    /// Errors that impact functionality but allow continued operation
    Error,
    /// Critical errors that prevent the console from functioning properly
    Critical,
}

/// Error categories for different retry strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Temporary network issues, timeouts, etc.
    Network,
    /// Authentication/authorization failures
    Authentication,
    /// Upstream service answered with a server error
    ServiceUnavailable,
    /// Configuration errors
    Configuration,
    /// Internal errors in our code
    Internal,
    /// Resource not found
    NotFound,
    /// Malformed data received from a collaborator
    Validation,
}

impl ErrorCategory {
    /// Returns true if errors in this category are generally retryable.
    /// Authentication failures are never retried automatically.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network | Self::ServiceUnavailable => true,
            Self::Authentication
            | Self::Configuration
            | Self::Internal
            | Self::NotFound
            | Self::Validation => false,
        }
    }
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{}: {} ({})", self.code, self.message, context)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code_str = match self {
            ErrorCode::Internal => "INTERNAL",
            ErrorCode::AuthenticationFailed => "AUTHENTICATION_FAILED",
            ErrorCode::AuthRefreshFailed => "AUTH_REFRESH_FAILED",
            ErrorCode::AuthLogoutFailed => "AUTH_LOGOUT_FAILED",
            ErrorCode::ApiRequestFailed => "API_REQUEST_FAILED",
            ErrorCode::ApiResponseInvalid => "API_RESPONSE_INVALID",
            ErrorCode::ApiNotFound => "API_NOT_FOUND",
            ErrorCode::NetworkFailure => "NETWORK_FAILURE",
            ErrorCode::ConfigInvalid => "CONFIG_INVALID",
        };
        write!(f, "{}", code_str)
    }
}

impl std::error::Error for ConsoleError {}

impl From<ConsoleErrorType> for ConsoleError {
    fn from(err: ConsoleErrorType) -> Self {
        let message = err.to_string();
        let (code, severity, category) = match &err {
            ConsoleErrorType::Internal(_) => (
                ErrorCode::Internal,
                ErrorSeverity::Critical,
                ErrorCategory::Internal,
            ),
            ConsoleErrorType::ApiRequestFailed { status, .. } => {
                let category = match *status {
                    401 | 403 => ErrorCategory::Authentication,
                    404 => ErrorCategory::NotFound,
                    s if s >= 500 => ErrorCategory::ServiceUnavailable,
                    _ => ErrorCategory::Validation,
                };
                (ErrorCode::ApiRequestFailed, ErrorSeverity::Error, category)
            }
            ConsoleErrorType::ApiResponseInvalid { .. } => (
                ErrorCode::ApiResponseInvalid,
                ErrorSeverity::Error,
                ErrorCategory::Validation,
            ),
            ConsoleErrorType::ApiNotFound { .. } => (
                ErrorCode::ApiNotFound,
                ErrorSeverity::Warning,
                ErrorCategory::NotFound,
            ),
            ConsoleErrorType::NetworkFailure { .. } => (
                ErrorCode::NetworkFailure,
                ErrorSeverity::Error,
                ErrorCategory::Network,
            ),
            ConsoleErrorType::ConfigInvalid { .. } => (
                ErrorCode::ConfigInvalid,
                ErrorSeverity::Critical,
                ErrorCategory::Configuration,
            ),
        };

        ConsoleError::new(code)
            .message(message)
            .severity(severity)
            .category(category)
            .build()
    }
}

impl From<AuthError> for ConsoleError {
    fn from(err: AuthError) -> Self {
        let code = match &err {
            AuthError::Authentication { .. } => ErrorCode::AuthenticationFailed,
            AuthError::Network(_) => ErrorCode::NetworkFailure,
            AuthError::Refresh(_) => ErrorCode::AuthRefreshFailed,
            AuthError::LogoutTransport(_) => ErrorCode::AuthLogoutFailed,
        };

        // The user-facing message goes first; the raw detail is kept as context for logs.
        ConsoleError::new(code)
            .message(err.user_message())
            .context(err.to_string())
            .category(err.category())
            .build()
    }
}
