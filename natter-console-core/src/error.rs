use thiserror::Error;

/// Common result type for console operations.
pub type Result<T> = std::result::Result<T, ConsoleError>;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("session expired, please log in again")]
    SessionExpired,
    #[error("authentication required: {0}")]
    AuthRequired(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request failed {status}: {message}")]
    Api { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("other error: {0}")]
    Other(String),
}

impl ConsoleError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Auth failures trump any other handling of the triggering action.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::AuthRequired(_))
    }
}
