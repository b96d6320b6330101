use serde::{Deserialize, Serialize};

use crate::operations::ToolExchange;
use crate::tools::ToolInvocationRequest;

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Result of a tool call, injected by the orchestrator.
    Tool,
}

/// One entry of the conversation transcript.
///
/// Tool messages carry the request they answer in `tool_call`, so a
/// request and its result always sit together in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolInvocationRequest>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_call: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_call: None,
        }
    }

    /// Build a tool-result message; content is the JSON-rendered result.
    pub fn tool_result(exchange: &ToolExchange) -> Self {
        Self {
            role: Role::Tool,
            content: exchange.result.to_json_string(),
            tool_call: Some(exchange.request.clone()),
        }
    }

    pub fn is_tool_result(&self) -> bool {
        self.role == Role::Tool
    }
}

/// What `process_turn` hands back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Final natural-language answer.
    pub response: String,
    /// Caller history + user message + tool results + final answer.
    pub updated_history: Vec<Message>,
}
