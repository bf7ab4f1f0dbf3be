use std::fmt;

use thiserror::Error;

/// The service rejected or flagged a request (HTTP status >= 400).
///
/// Carries exactly what the error body documents. `Display` renders the
/// warning shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status_code: u16,
    pub error_code: Option<String>,
    pub request_id: Option<String>,
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Analyst API error (status {}, request id {}, error code {}): {}",
            self.status_code,
            self.request_id.as_deref().unwrap_or("n/a"),
            self.error_code.as_deref().unwrap_or("n/a"),
            self.message
        )
    }
}

impl std::error::Error for ApiError {}

/// The request never produced a usable response: connection failure,
/// timeout, unreadable or malformed body, or no credential available.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Transport error: {cause}")]
pub struct TransportError {
    pub cause: String,
}

impl TransportError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self {
            cause: cause.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let cause = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            err.to_string()
        };
        Self { cause }
    }
}

/// Usage errors: an operation was attempted in a state that does not allow it.
/// These are rejected before anything is mutated or sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("A request is already in flight")]
    RequestInFlight,

    #[error("No request is in flight")]
    NotAwaitingResponse,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("No suggestion is selected")]
    NoActiveSuggestion,

    #[error("Unknown request id: {0}")]
    UnknownRequestId(String),

    #[error("Unknown semantic model: {0}")]
    UnknownSemanticModel(String),
}

/// Failure of a feedback submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedbackError {
    #[error("No turn carries request id {0}")]
    UnknownRequest(String),

    #[error("Cannot submit feedback while a request is in flight")]
    RequestInFlight,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failure to credential a request.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("No token configured")]
    MissingToken,

    #[error("Failed to read token file {path}: {source}")]
    TokenFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Token file {0} is empty")]
    EmptyTokenFile(String),
}

impl From<CredentialError> for TransportError {
    fn from(err: CredentialError) -> Self {
        TransportError::new(format!("credential unavailable: {}", err))
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file: {0}")]
    Write(#[source] std::io::Error),

    #[error("Could not determine home directory")]
    NoHomeDir,

    #[error("Neither an account nor a host is configured")]
    MissingHost,

    #[error("Neither a token nor a token file is configured")]
    MissingToken,

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Invalid semantic model path '{0}': expected DATABASE.SCHEMA.STAGE/file")]
    InvalidSemanticModel(String),

    #[error("No semantic models are configured")]
    NoSemanticModels,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
