use serde::{Deserialize, Serialize};

use crate::tools::ToolInvocationRequest;

/// Resource-control operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
        }
    }

    /// Whether this operation needs a resource identifier.
    pub fn requires_identifier(&self) -> bool {
        matches!(self, Self::Read | Self::Update | Self::Delete)
    }

    /// Whether the control API completes this operation asynchronously.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome status of one tool execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Success,
    Error,
}

/// Classification of a contained tool failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The capability call itself failed (API error, missing resource, ...).
    ToolExecution,
    /// The model asked for an unknown tool or sent malformed arguments.
    Protocol,
}

/// Failure detail attached to an error-status result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: FailureKind,
    /// Human-readable explanation.
    pub message: String,
    /// Provider error code (e.g. "ResourceNotFoundException"), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Normalized result of executing one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub status: OperationStatus,
    /// Operation performed. `None` only when the request was too malformed
    /// to tell which operation was meant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    /// Resource type (e.g. "AWS::S3::Bucket").
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Short status line (e.g. "Retrieved 3 resources").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Structured result data: resource list, properties, progress event,
    /// or log entries depending on the tool and operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Pagination token when more list results are available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolFailure>,
}

impl OperationResult {
    pub fn success(operation: Operation, resource_type: impl Into<String>) -> Self {
        Self {
            status: OperationStatus::Success,
            operation: Some(operation),
            resource_type: resource_type.into(),
            identifier: None,
            message: None,
            payload: None,
            next_token: None,
            error: None,
        }
    }

    pub fn failure(
        operation: Option<Operation>,
        resource_type: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: OperationStatus::Error,
            operation,
            resource_type: resource_type.into(),
            identifier: None,
            message: None,
            payload: None,
            next_token: None,
            error: Some(ToolFailure {
                kind,
                message: message.into(),
                code: None,
            }),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_next_token(mut self, token: Option<String>) -> Self {
        self.next_token = token;
        self
    }

    /// Attach a provider error code. No-op on success results.
    pub fn with_error_code(mut self, code: Option<String>) -> Self {
        if let Some(err) = self.error.as_mut() {
            err.code = code;
        }
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// JSON text used as the tool-result content in the transcript.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| unserializable(&self.resource_type, e))
    }
}

fn unserializable(resource_type: &str, err: impl std::fmt::Display) -> String {
    serde_json::json!({
        "status": "error",
        "resource_type": resource_type,
        "error": {
            "kind": "tool_execution",
            "message": format!("unserializable result: {err}"),
        },
    })
    .to_string()
}

/// A tool request paired with the result it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExchange {
    pub request: ToolInvocationRequest,
    pub result: OperationResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_result_wire_shape() {
        let result = OperationResult::success(Operation::List, "AWS::S3::Bucket")
            .with_message("Retrieved 2 resources")
            .with_payload(json!([{"BucketName": "a"}, {"BucketName": "b"}]));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["operation"], "list");
        assert_eq!(value["payload"].as_array().unwrap().len(), 2);
        assert!(value.get("error").is_none());
        assert!(value.get("next_token").is_none());
    }

    #[test]
    fn failure_result_carries_kind_and_code() {
        let result = OperationResult::failure(
            Some(Operation::Delete),
            "AWS::S3::Bucket",
            FailureKind::ToolExecution,
            "bucket does not exist",
        )
        .with_error_code(Some("ResourceNotFoundException".into()));
        assert!(!result.is_success());
        assert_eq!(result.failure_kind(), Some(FailureKind::ToolExecution));

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"]["kind"], "tool_execution");
        assert_eq!(value["error"]["code"], "ResourceNotFoundException");
    }

    #[test]
    fn error_code_ignored_on_success() {
        let result = OperationResult::success(Operation::Read, "AWS::S3::Bucket")
            .with_error_code(Some("Whatever".into()));
        assert!(result.error.is_none());
    }

    #[test]
    fn protocol_failure_without_operation() {
        let result = OperationResult::failure(
            None,
            "unknown",
            FailureKind::Protocol,
            "unknown tool: hack_account",
        );
        let value: serde_json::Value = serde_json::from_str(&result.to_json_string()).unwrap();
        assert!(value.get("operation").is_none());
        assert_eq!(value["error"]["kind"], "protocol");
    }

    #[test]
    fn unserializable_fallback_is_valid_json() {
        let text = unserializable(r#"AWS::S3::"Bucket""#, "map key must be a string");
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["resource_type"], r#"AWS::S3::"Bucket""#);
        assert_eq!(value["error"]["kind"], "tool_execution");
        assert_eq!(
            value["error"]["message"],
            "unserializable result: map key must be a string"
        );
    }

    #[test]
    fn operation_flags() {
        assert!(Operation::Delete.requires_identifier());
        assert!(!Operation::List.requires_identifier());
        assert!(Operation::Create.is_mutation());
        assert!(!Operation::Read.is_mutation());
        assert_eq!(Operation::Update.to_string(), "update");
    }
}
