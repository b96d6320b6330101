//! Tool catalog: the operations the model may request.
//!
//! Each tool lives in its own module with a typed argument record. `ToolId`
//! is the closed set of tools; dispatch on it is an exhaustive `match`, so
//! adding a tool without wiring its handler fails to compile.

pub mod cloud_control;
pub mod cloudwatch_logs;

use cp_protocol::ToolSpec;

pub use cloud_control::{CloudControl, CloudControlArgs, CloudControlRequest};
pub use cloudwatch_logs::{CloudWatchLogs, LogQueryArgs, LogQueryRequest};

/// Descriptive metadata every tool exposes to the model.
pub trait CloudTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for the tool's arguments.
    fn parameters_schema(&self) -> serde_json::Value;
}

/// Identifier of a known tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolId {
    CloudControl,
    CloudWatchLogs,
}

impl ToolId {
    /// All tools, in catalog order.
    pub const ALL: [ToolId; 2] = [ToolId::CloudControl, ToolId::CloudWatchLogs];

    pub fn tool(&self) -> &'static dyn CloudTool {
        match self {
            Self::CloudControl => &CloudControl,
            Self::CloudWatchLogs => &CloudWatchLogs,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CloudControl => cloud_control::TOOL_NAME,
            Self::CloudWatchLogs => cloudwatch_logs::TOOL_NAME,
        }
    }

    /// Resolve a model-supplied tool name. Case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }

    pub fn spec(&self) -> ToolSpec {
        let tool = self.tool();
        ToolSpec {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameter_schema: tool.parameters_schema(),
        }
    }
}

/// Catalog of every tool, in `ToolId::ALL` order.
pub fn all_specs() -> Vec<ToolSpec> {
    ToolId::ALL.iter().map(ToolId::spec).collect()
}

/// Arguments of a tool request, decoded into the tool's own record.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArguments {
    CloudControl(CloudControlArgs),
    CloudWatchLogs(LogQueryArgs),
}

impl ToolArguments {
    /// Decode raw model arguments for the given tool.
    pub fn parse(id: ToolId, raw: &serde_json::Value) -> Result<Self, String> {
        let decoded = match id {
            ToolId::CloudControl => serde_json::from_value(raw.clone()).map(Self::CloudControl),
            ToolId::CloudWatchLogs => serde_json::from_value(raw.clone()).map(Self::CloudWatchLogs),
        };
        decoded.map_err(|e| format!("invalid arguments for {}: {e}", id.name()))
    }
}
