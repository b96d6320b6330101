//! Model capability: one completion call, optionally with tools.
//!
//! `ModelClient` is the seam between the orchestrator and the LLM provider.
//! Production uses `BedrockModelClient` (Converse API); tests script replies
//! with `ScriptedModelClient`.

pub mod bedrock;

use async_trait::async_trait;
use cp_protocol::{Message, ToolInvocationRequest, ToolSpec};
use thiserror::Error;

pub use bedrock::BedrockModelClient;

/// Errors from a model call.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// No response was received (DNS, TLS, connection reset, ...).
    #[error("connection error: {0}")]
    Connection(String),

    /// The provider answered with an error.
    #[error("API error: {0}")]
    Api(String),

    #[error("model call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

/// One model call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: Option<&'a str>,
    pub messages: &'a [Message],
    /// Tools the model may call. `None` means a plain completion.
    pub tools: Option<&'a [ToolSpec]>,
    pub max_tokens: i32,
}

/// What the model answered with.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Text(String),
    ToolCalls(Vec<ToolInvocationRequest>),
}

impl ModelReply {
    /// Tool calls win over text; an empty call list is a text reply.
    pub fn from_parts(text: String, calls: Vec<ToolInvocationRequest>) -> Self {
        if calls.is_empty() {
            Self::Text(text)
        } else {
            Self::ToolCalls(calls)
        }
    }
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<ModelReply, ModelError>;

    /// Minimal round trip used to validate the client before first use.
    async fn check_connection(&self) -> Result<(), ModelError> {
        let ping = [Message::user("ping")];
        self.complete(CompletionRequest {
            system: None,
            messages: &ping,
            tools: None,
            max_tokens: 1,
        })
        .await
        .map(|_| ())
    }
}
