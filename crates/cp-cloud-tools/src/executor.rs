//! Operation executor: turns a tool request into an `OperationResult`.
//!
//! `execute` never fails: unknown tools and malformed arguments come back
//! as protocol errors, capability failures as tool-execution errors.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use cp_protocol::{FailureKind, Operation, OperationResult, ToolInvocationRequest};
use serde::Deserialize;

use crate::capability::{LogQuery, ResourceControl};
use crate::tools::{cloud_control, cloudwatch_logs, ToolArguments, ToolId};

/// Defaults applied when the model leaves optional arguments out.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub default_region: String,
    pub default_max_results: u32,
    pub default_hours_back: u32,
    pub log_event_limit: usize,
    pub default_filter_pattern: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_region: "us-east-1".into(),
            default_max_results: 20,
            default_hours_back: 1,
            log_event_limit: 10,
            default_filter_pattern: "ERROR".into(),
        }
    }
}

pub struct OperationExecutor {
    resources: Arc<dyn ResourceControl>,
    logs: Arc<dyn LogQuery>,
    config: ExecutorConfig,
}

impl OperationExecutor {
    pub fn new(
        resources: Arc<dyn ResourceControl>,
        logs: Arc<dyn LogQuery>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            resources,
            logs,
            config,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute one tool request.
    pub async fn execute(&self, request: &ToolInvocationRequest) -> OperationResult {
        let started = Instant::now();
        let result = self.dispatch(request).await;

        tracing::info!(
            tool = %request.tool_name,
            call_id = %request.id,
            success = result.is_success(),
            failure = ?result.failure_kind(),
            latency_ms = started.elapsed().as_millis() as u64,
            "tool executed"
        );
        result
    }

    async fn dispatch(&self, request: &ToolInvocationRequest) -> OperationResult {
        let Some(id) = ToolId::from_name(&request.tool_name) else {
            tracing::warn!(tool = %request.tool_name, "model requested unknown tool");
            let available: Vec<&str> = ToolId::ALL.iter().map(ToolId::name).collect();
            return OperationResult::failure(
                None,
                "unknown",
                FailureKind::Protocol,
                format!(
                    "Unknown tool: '{}'. Available tools: {}",
                    request.tool_name,
                    available.join(", ")
                ),
            );
        };

        let args = match ToolArguments::parse(id, &request.arguments) {
            Ok(args) => args,
            Err(msg) => {
                tracing::warn!(tool = id.name(), error = %msg, "malformed tool arguments");
                return protocol_failure(id, &request.arguments, msg);
            }
        };

        match args {
            ToolArguments::CloudControl(args) => {
                let operation = args.operation;
                let resource_type = args.resource_type.clone();
                match args.validate(&self.config) {
                    Ok(req) => cloud_control::execute(req, self.resources.as_ref()).await,
                    Err(msg) => OperationResult::failure(
                        Some(operation),
                        resource_type,
                        FailureKind::Protocol,
                        format!("Validation error: {msg}"),
                    ),
                }
            }
            ToolArguments::CloudWatchLogs(args) => match args.validate(&self.config) {
                Ok(req) => cloudwatch_logs::execute(req, self.logs.as_ref(), Utc::now()).await,
                Err(msg) => protocol_failure(id, &request.arguments, format!("Validation error: {msg}")),
            },
        }
    }
}

/// Protocol failure that still reports whatever operation and resource type
/// could be read from the raw arguments.
fn protocol_failure(id: ToolId, raw: &serde_json::Value, message: String) -> OperationResult {
    let (operation, resource_type) = match id {
        ToolId::CloudControl => (
            raw.get("operation")
                .and_then(|v| serde_json::from_value::<Operation>(v.clone()).ok()),
            raw.get("resource_type")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
        ),
        ToolId::CloudWatchLogs => (
            Some(Operation::List),
            cloudwatch_logs::LOG_EVENT_RESOURCE_TYPE.to_string(),
        ),
    };
    OperationResult::failure(operation, resource_type, FailureKind::Protocol, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockLogQuery, MockResourceControl};
    use cp_protocol::OperationStatus;
    use serde_json::json;

    fn executor(control: MockResourceControl) -> OperationExecutor {
        OperationExecutor::new(
            Arc::new(control),
            Arc::new(MockLogQuery::new()),
            ExecutorConfig::default(),
        )
    }

    fn call(tool: &str, args: serde_json::Value) -> ToolInvocationRequest {
        ToolInvocationRequest::new("call-1", tool, args)
    }

    #[test]
    fn config_deserializes_partial_toml_table() {
        let config: ExecutorConfig =
            serde_json::from_value(json!({"default_region": "eu-west-1"})).unwrap();
        assert_eq!(config.default_region, "eu-west-1");
        assert_eq!(config.default_max_results, 20);
        assert_eq!(config.log_event_limit, 10);
    }

    #[tokio::test]
    async fn unknown_tool_is_protocol_error() {
        let exec = executor(MockResourceControl::new());
        let result = exec.execute(&call("delete_everything", json!({}))).await;

        assert_eq!(result.status, OperationStatus::Error);
        assert!(result.operation.is_none());
        assert_eq!(result.failure_kind(), Some(FailureKind::Protocol));
        let message = result.error.unwrap().message;
        assert!(message.contains("delete_everything"));
        assert!(message.contains("aws_cloud_control"));
    }

    #[tokio::test]
    async fn malformed_arguments_are_protocol_error() {
        let exec = executor(MockResourceControl::new());
        let result = exec
            .execute(&call("aws_cloud_control", json!({"operation": "list"})))
            .await;

        assert_eq!(result.failure_kind(), Some(FailureKind::Protocol));
        assert_eq!(result.operation, Some(Operation::List));
        assert!(result.error.unwrap().message.contains("resource_type"));
    }

    #[tokio::test]
    async fn validation_failure_is_protocol_error_without_capability_call() {
        let control = Arc::new(MockResourceControl::with_sample_buckets());
        let exec = OperationExecutor::new(
            control.clone(),
            Arc::new(MockLogQuery::new()),
            ExecutorConfig::default(),
        );
        let result = exec
            .execute(&call(
                "aws_cloud_control",
                json!({"operation": "delete", "resource_type": "AWS::S3::Bucket"}),
            ))
            .await;

        assert_eq!(result.failure_kind(), Some(FailureKind::Protocol));
        assert_eq!(result.operation, Some(Operation::Delete));
        assert_eq!(result.resource_type, "AWS::S3::Bucket");
        assert!(control.calls().is_empty());
    }

    #[tokio::test]
    async fn list_dispatches_to_resource_control() {
        let exec = executor(MockResourceControl::with_sample_buckets());
        let result = exec
            .execute(&call(
                "aws_cloud_control",
                json!({"operation": "list", "resource_type": "AWS::S3::Bucket"}),
            ))
            .await;

        assert!(result.is_success());
        assert_eq!(result.payload.unwrap().as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn repeated_list_is_identical() {
        let exec = executor(MockResourceControl::with_sample_buckets());
        let req = call(
            "aws_cloud_control",
            json!({"operation": "list", "resource_type": "AWS::S3::Bucket"}),
        );
        let first = exec.execute(&req).await;
        let second = exec.execute(&req).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn log_tool_dispatches_to_log_query() {
        let logs = Arc::new(MockLogQuery::new());
        logs.add_event(
            "/aws/lambda/auth-service",
            Utc::now() - chrono::Duration::minutes(2),
            "ERROR database timeout",
        );
        let exec = OperationExecutor::new(
            Arc::new(MockResourceControl::new()),
            logs,
            ExecutorConfig::default(),
        );

        let result = exec
            .execute(&call("cloudwatch_logs", json!({"function_name": "auth-service"})))
            .await;

        assert!(result.is_success());
        assert_eq!(result.payload.unwrap()[0]["message"], "ERROR database timeout");
    }

    #[tokio::test]
    async fn log_validation_failure_is_protocol_error() {
        let exec = executor(MockResourceControl::new());
        let result = exec
            .execute(&call("cloudwatch_logs", json!({"function_name": ""})))
            .await;

        assert_eq!(result.failure_kind(), Some(FailureKind::Protocol));
        assert_eq!(result.resource_type, cloudwatch_logs::LOG_EVENT_RESOURCE_TYPE);
    }
}
