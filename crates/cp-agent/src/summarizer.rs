//! Summarizer: turns raw tool results into a short answer for the user.
//!
//! Best-effort: if the model call fails or returns nothing usable, the
//! results are rendered with a fixed template instead.

use cp_cloud_tools::tools::cloudwatch_logs::LOG_EVENT_RESOURCE_TYPE;
use cp_protocol::{Message, Operation, OperationResult, ToolExchange};
use serde_json::json;

use crate::model::{CompletionRequest, ModelClient, ModelReply};
use crate::prompts;

/// Property names shown when listing resources in the fallback rendering.
const NAME_KEYS: &[&str] = &[
    "BucketName",
    "FunctionName",
    "TableName",
    "DBInstanceIdentifier",
    "InstanceId",
    "QueueName",
    "Name",
];

pub struct Summarizer {
    max_tokens: i32,
}

impl Summarizer {
    pub fn new(max_tokens: i32) -> Self {
        Self { max_tokens }
    }

    /// Summarize `exchanges` as an answer to `user_question`.
    pub async fn summarize(
        &self,
        model: &dyn ModelClient,
        user_question: &str,
        exchanges: &[ToolExchange],
    ) -> String {
        let all_failed = !exchanges.is_empty() && exchanges.iter().all(|e| !e.result.is_success());
        let prompt = if all_failed {
            prompts::diagnosis_prompt(user_question, &render_errors(exchanges))
        } else {
            prompts::summary_prompt(user_question, &render_results(exchanges))
        };

        let messages = [Message::user(prompt)];
        let reply = model
            .complete(CompletionRequest {
                system: None,
                messages: &messages,
                tools: None,
                max_tokens: self.max_tokens,
            })
            .await;

        match reply {
            Ok(ModelReply::Text(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(ModelReply::Text(_)) => {
                tracing::warn!("summary reply was empty, using template");
                render_fallback(exchanges)
            }
            Ok(ModelReply::ToolCalls(calls)) => {
                tracing::warn!(count = calls.len(), "summary reply requested tools, using template");
                render_fallback(exchanges)
            }
            Err(e) => {
                tracing::warn!(error = %e, "summary call failed, using template");
                render_fallback(exchanges)
            }
        }
    }
}

fn render_results(exchanges: &[ToolExchange]) -> String {
    let entries: Vec<serde_json::Value> = exchanges
        .iter()
        .map(|e| {
            json!({
                "tool": e.request.tool_name,
                "arguments": e.request.arguments,
                "result": e.result,
            })
        })
        .collect();
    serde_json::to_string_pretty(&entries).unwrap_or_default()
}

fn render_errors(exchanges: &[ToolExchange]) -> String {
    exchanges
        .iter()
        .filter_map(|e| {
            let error = e.result.error.as_ref()?;
            Some(format!(
                "Tool: {}\nOperation: {}\nResource Type: {}\nError Message: {}\nError Code: {}",
                e.request.tool_name,
                e.result.operation.map_or("unknown", |op| op.as_str()),
                e.result.resource_type,
                error.message,
                error.code.as_deref().unwrap_or("Not provided"),
            ))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Deterministic rendering of results, one line per exchange.
pub fn render_fallback(exchanges: &[ToolExchange]) -> String {
    if exchanges.is_empty() {
        return "No operations were performed.".into();
    }
    exchanges
        .iter()
        .map(|e| render_result(&e.result))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_result(result: &OperationResult) -> String {
    let resource_type = &result.resource_type;

    if let Some(error) = &result.error {
        let op = result.operation.map_or("requested", |op| op.as_str());
        return format!(
            "Sorry, the {op} operation on {resource_type} failed: {}",
            error.message
        );
    }

    let payload = result.payload.as_ref();
    match result.operation {
        Some(Operation::List) if resource_type == LOG_EVENT_RESOURCE_TYPE => {
            let mut line = result
                .message
                .clone()
                .unwrap_or_else(|| "Log query completed.".into());
            let latest = payload
                .and_then(|p| p.as_array())
                .and_then(|events| events.last())
                .and_then(|event| event["message"].as_str());
            if let Some(latest) = latest {
                line.push_str(&format!(". Latest: {latest}"));
            }
            line
        }
        Some(Operation::List) => {
            let items = payload.and_then(|p| p.as_array()).map_or(&[][..], Vec::as_slice);
            let names: Vec<&str> = items.iter().filter_map(resource_name).collect();
            let mut line = format!("Found {} {resource_type} resources", items.len());
            if !names.is_empty() {
                line.push_str(&format!(": {}", names.join(", ")));
            }
            if result.next_token.is_some() {
                line.push_str(" (more available)");
            }
            line.push('.');
            line
        }
        Some(Operation::Read) => {
            let count = payload.and_then(|p| p.as_object()).map_or(0, |o| o.len());
            format!(
                "{resource_type} {} has {count} properties.",
                result.identifier.as_deref().unwrap_or("(unnamed)")
            )
        }
        Some(op) => {
            let token = payload
                .and_then(|p| p["request_token"].as_str())
                .unwrap_or("unknown");
            format!(
                "Request to {op} {resource_type} accepted (request token {token}); completion is pending."
            )
        }
        None => result
            .message
            .clone()
            .unwrap_or_else(|| format!("Operation on {resource_type} completed.")),
    }
}

fn resource_name(item: &serde_json::Value) -> Option<&str> {
    NAME_KEYS.iter().find_map(|key| item.get(*key)?.as_str())
}
