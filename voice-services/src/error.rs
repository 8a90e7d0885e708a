use thiserror::Error;

/// Errors from the remote transcription and image-generation services.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service rejected the credential (HTTP 401). Surfaced to the
    /// user as an invalid-API-key condition, never retried.
    #[error("authentication failed: check API key")]
    AuthenticationFailure,

    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout")]
    Timeout,

    #[error("service error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("i/o error: {0}")]
    Io(String),
}

impl ServiceError {
    /// Transient failures worth retrying: network drops, timeouts, and
    /// server-side 5xx responses.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
