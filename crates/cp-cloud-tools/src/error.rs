//! Cloud capability error types.

use thiserror::Error;

/// Errors returned by the resource-control and log-query capabilities.
#[derive(Debug, Clone, Error)]
pub enum CloudError {
    #[error("AWS API error: {message}")]
    Api {
        code: Option<String>,
        message: String,
    },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid response from AWS: {0}")]
    InvalidResponse(String),
}

impl CloudError {
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Provider error code, when the service returned one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Convenience alias for capability results.
pub type CloudResult<T> = Result<T, CloudError>;
