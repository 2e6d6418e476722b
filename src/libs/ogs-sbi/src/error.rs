//! SBI Error Types

use thiserror::Error;

/// SBI Error type
#[derive(Error, Debug)]
pub enum SbiError {
    /// HTTP/2 connection error
    #[error("HTTP/2 connection error: {0}")]
    ConnectionError(String),

    /// Connect or request timeout
    #[error("Request timeout")]
    Timeout,

    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP error with status code
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Client error: {0}")]
    ClientError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Hyper error: {0}")]
    HyperError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl SbiError {
    /// Create an HTTP error from status code
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::HttpError {
            status,
            message: message.into(),
        }
    }

    /// Get the HTTP status code if this is an HTTP error
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpError { status, .. } => Some(*status),
            Self::ServiceUnavailable(_) => Some(503),
            Self::Timeout => Some(504),
            _ => None,
        }
    }

    /// Transport-level failures where the peer never produced an answer
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError(_) | Self::HyperError(_) | Self::IoError(_) | Self::Timeout
        )
    }
}

/// Result type for SBI operations
pub type SbiResult<T> = Result<T, SbiError>;
