//! cloudwatch_logs: recent log events for a Lambda function.

use chrono::{DateTime, Duration, Utc};
use cp_protocol::{FailureKind, Operation, OperationResult};
use serde::Deserialize;
use serde_json::json;

use super::CloudTool;
use crate::capability::{LogFilter, LogQuery};
use crate::executor::ExecutorConfig;

pub const TOOL_NAME: &str = "cloudwatch_logs";

/// Resource type reported on log-query results.
pub const LOG_EVENT_RESOURCE_TYPE: &str = "AWS::Logs::LogEvent";

/// Longest look-back window accepted (30 days).
pub const MAX_HOURS_BACK: u32 = 720;

pub struct CloudWatchLogs;

impl CloudTool for CloudWatchLogs {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Search recent CloudWatch log events of an AWS Lambda function, e.g. to find the \
         error behind a failing deployment."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "function_name": {
                    "type": "string",
                    "description": "Lambda function name; logs are read from /aws/lambda/<function_name>"
                },
                "hours_back": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": MAX_HOURS_BACK,
                    "description": "How many hours of logs to search (default: 1)"
                },
                "filter_pattern": {
                    "type": "string",
                    "description": "CloudWatch filter pattern (default: ERROR; empty string matches everything)"
                }
            },
            "required": ["function_name"]
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogQueryArgs {
    pub function_name: String,
    #[serde(default)]
    pub hours_back: Option<u32>,
    #[serde(default)]
    pub filter_pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogQueryRequest {
    pub function_name: String,
    pub log_group: String,
    pub hours_back: u32,
    pub pattern: Option<String>,
    pub limit: usize,
}

impl LogQueryArgs {
    pub fn validate(self, config: &ExecutorConfig) -> Result<LogQueryRequest, String> {
        let function_name = self.function_name.trim().to_string();
        if function_name.is_empty() {
            return Err("function_name must not be empty".into());
        }
        if function_name.chars().any(char::is_whitespace) {
            return Err(format!("Invalid function name: {function_name}"));
        }

        let hours_back = self.hours_back.unwrap_or(config.default_hours_back);
        if !(1..=MAX_HOURS_BACK).contains(&hours_back) {
            return Err(format!(
                "hours_back must be between 1 and {MAX_HOURS_BACK}, got {hours_back}"
            ));
        }

        let pattern = self
            .filter_pattern
            .unwrap_or_else(|| config.default_filter_pattern.clone());
        let pattern = Some(pattern.trim().to_string()).filter(|p| !p.is_empty());

        Ok(LogQueryRequest {
            log_group: format!("/aws/lambda/{function_name}"),
            function_name,
            hours_back,
            pattern,
            limit: config.log_event_limit,
        })
    }
}

/// Query the window ending at `now`. Keeps the most recent `limit` events,
/// oldest first.
pub async fn execute(
    request: LogQueryRequest,
    logs: &dyn LogQuery,
    now: DateTime<Utc>,
) -> OperationResult {
    let filter = LogFilter {
        log_group: request.log_group.clone(),
        start: now - Duration::hours(i64::from(request.hours_back)),
        end: now,
        pattern: request.pattern.clone(),
    };
    tracing::info!(
        log_group = %filter.log_group,
        hours_back = request.hours_back,
        pattern = ?filter.pattern,
        "querying log events"
    );

    let mut events = match logs.filter_events(&filter).await {
        Ok(events) => events,
        Err(err) => {
            tracing::error!(log_group = %filter.log_group, error = %err, "log query failed");
            return OperationResult::failure(
                Some(Operation::List),
                LOG_EVENT_RESOURCE_TYPE,
                FailureKind::ToolExecution,
                format!("Failed to query logs for {}: {err}", request.function_name),
            )
            .with_error_code(err.code().map(str::to_string))
            .with_identifier(request.log_group);
        }
    };

    let total = events.len();
    events.sort_by_key(|e| e.timestamp);
    let kept = events.split_off(total.saturating_sub(request.limit));

    let mut message = format!(
        "Found {total} matching log events in {} over the last {}h",
        request.log_group, request.hours_back
    );
    if kept.len() < total {
        message.push_str(&format!(" (showing the latest {})", kept.len()));
    }

    OperationResult::success(Operation::List, LOG_EVENT_RESOURCE_TYPE)
        .with_identifier(request.log_group)
        .with_message(message)
        .with_payload(serde_json::to_value(&kept).unwrap_or_default())
}
