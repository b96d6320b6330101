//! Agent error types.

use thiserror::Error;

use crate::model::ModelError;

/// Errors that terminate a turn. Tool failures never show up here; they are
/// folded into the transcript as error results.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A session client could not be built or failed its health check.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// The caller's request was rejected before any collaborator was contacted.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Convenience alias for agent results.
pub type AgentResult<T> = Result<T, AgentError>;
