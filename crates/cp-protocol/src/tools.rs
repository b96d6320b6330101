use serde::{Deserialize, Serialize};

/// Catalog entry describing one callable tool to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name the model uses to request it (e.g. "aws_cloud_control").
    pub name: String,
    /// Natural-language description shown to the model.
    pub description: String,
    /// JSON Schema for the tool's arguments object.
    pub parameter_schema: serde_json::Value,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    /// Model-assigned tool-use id, echoed back with the result.
    pub id: String,
    /// Name of the requested tool.
    pub tool_name: String,
    /// Arguments as produced by the model. Usually a JSON object.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolInvocationRequest {
    pub fn new(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}
