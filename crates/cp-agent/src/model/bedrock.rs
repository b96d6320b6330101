//! AWS Bedrock model client: Converse API with tool use.
//!
//! Transcript rendering rules:
//! - user/assistant messages become text blocks;
//! - a run of consecutive tool messages becomes one assistant turn of
//!   `toolUse` blocks followed by one user turn of `toolResult` blocks;
//! - adjacent turns with the same role are merged, since Converse requires
//!   alternating roles.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_bedrockruntime::Client as BedrockClient;
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, SdkError};
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, ConverseOutput, InferenceConfiguration,
    Message as BedrockMessage, SystemContentBlock, Tool, ToolConfiguration, ToolInputSchema,
    ToolResultBlock, ToolResultContentBlock, ToolResultStatus, ToolSpecification, ToolUseBlock,
};
use aws_smithy_types::{Document, Number};
use cp_protocol::{Message, Role, ToolInvocationRequest, ToolSpec};
use tokio::time::timeout;

use super::{CompletionRequest, ModelClient, ModelError, ModelReply};
use crate::config::ModelConfig;

/// Bedrock Converse API model client.
pub struct BedrockModelClient {
    client: BedrockClient,
    model_id: String,
    timeout: Duration,
}

impl BedrockModelClient {
    /// Create a client around a pre-built Bedrock SDK client.
    pub fn new(client: BedrockClient, model_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            model_id: model_id.into(),
            timeout,
        }
    }

    /// Build from a loaded AWS config, honoring the endpoint override.
    pub fn from_sdk_config(sdk_config: &SdkConfig, model: &ModelConfig) -> Self {
        let mut builder = aws_sdk_bedrockruntime::config::Builder::from(sdk_config);
        if let Some(url) = &model.endpoint_url {
            builder = builder.endpoint_url(url);
        }
        Self::new(
            BedrockClient::from_conf(builder.build()),
            &model.model_id,
            Duration::from_secs(model.timeout_secs),
        )
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[async_trait]
impl ModelClient for BedrockModelClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<ModelReply, ModelError> {
        let messages = render_messages(request.messages)?;

        let mut call = self
            .client
            .converse()
            .model_id(&self.model_id)
            .set_messages(Some(messages))
            .inference_config(
                InferenceConfiguration::builder()
                    .max_tokens(request.max_tokens)
                    .build(),
            );
        if let Some(system) = request.system {
            call = call.system(SystemContentBlock::Text(system.to_string()));
        }
        if let Some(tools) = request.tools.filter(|t| !t.is_empty()) {
            call = call.tool_config(tool_configuration(tools)?);
        }

        let response = match timeout(self.timeout, call.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(converse_error(e)),
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "bedrock converse timed out"
                );
                return Err(ModelError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        tracing::debug!(
            model_id = %self.model_id,
            stop_reason = ?response.stop_reason(),
            "bedrock converse response"
        );
        parse_output(response.output())
    }
}

fn converse_error<E, R>(err: SdkError<E, R>) -> ModelError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let detail = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            tracing::warn!(error = %detail, "bedrock unreachable");
            ModelError::Connection(detail)
        }
        _ => {
            tracing::warn!(error = %detail, "bedrock converse failed");
            ModelError::Api(detail)
        }
    }
}

fn build_error(what: &str, e: impl std::fmt::Display) -> ModelError {
    ModelError::Api(format!("failed to build {what}: {e}"))
}

// ── Request rendering ─────────────────────────────────────────

fn tool_configuration(tools: &[ToolSpec]) -> Result<ToolConfiguration, ModelError> {
    let tools = tools
        .iter()
        .map(|spec| {
            ToolSpecification::builder()
                .name(&spec.name)
                .description(&spec.description)
                .input_schema(ToolInputSchema::Json(to_document(&spec.parameter_schema)))
                .build()
                .map(Tool::ToolSpec)
                .map_err(|e| build_error("tool specification", e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    ToolConfiguration::builder()
        .set_tools(Some(tools))
        .build()
        .map_err(|e| build_error("tool configuration", e))
}

/// Render the transcript as Converse messages.
pub(crate) fn render_messages(messages: &[Message]) -> Result<Vec<BedrockMessage>, ModelError> {
    let mut turns: Vec<(ConversationRole, Vec<ContentBlock>)> = Vec::new();

    let mut i = 0;
    while i < messages.len() {
        let msg = &messages[i];
        match msg.role {
            Role::User => push_turn(&mut turns, ConversationRole::User, text_block(&msg.content)),
            Role::Assistant => {
                push_turn(&mut turns, ConversationRole::Assistant, text_block(&msg.content))
            }
            Role::Tool => {
                let run_end = messages[i..]
                    .iter()
                    .position(|m| m.role != Role::Tool)
                    .map_or(messages.len(), |offset| i + offset);

                let mut uses = Vec::new();
                let mut results = Vec::new();
                for tool_msg in &messages[i..run_end] {
                    match &tool_msg.tool_call {
                        Some(call) => {
                            uses.push(tool_use_block(call)?);
                            results.push(tool_result_block(&call.id, &tool_msg.content)?);
                        }
                        // A result whose request was lost can only be passed on as text.
                        None => results.push(ContentBlock::Text(format!(
                            "Tool result: {}",
                            tool_msg.content
                        ))),
                    }
                }
                push_turn(&mut turns, ConversationRole::Assistant, uses);
                push_turn(&mut turns, ConversationRole::User, results);
                i = run_end;
                continue;
            }
        }
        i += 1;
    }

    turns
        .into_iter()
        .map(|(role, content)| {
            BedrockMessage::builder()
                .role(role)
                .set_content(Some(content))
                .build()
                .map_err(|e| build_error("message", e))
        })
        .collect()
}

fn push_turn(
    turns: &mut Vec<(ConversationRole, Vec<ContentBlock>)>,
    role: ConversationRole,
    blocks: Vec<ContentBlock>,
) {
    if blocks.is_empty() {
        return;
    }
    match turns.last_mut() {
        Some((last_role, content)) if *last_role == role => content.extend(blocks),
        _ => turns.push((role, blocks)),
    }
}

/// Converse rejects blank text blocks.
fn text_block(text: &str) -> Vec<ContentBlock> {
    if text.trim().is_empty() {
        Vec::new()
    } else {
        vec![ContentBlock::Text(text.to_string())]
    }
}

fn tool_use_block(call: &ToolInvocationRequest) -> Result<ContentBlock, ModelError> {
    ToolUseBlock::builder()
        .tool_use_id(&call.id)
        .name(&call.tool_name)
        .input(to_document(&call.arguments))
        .build()
        .map(ContentBlock::ToolUse)
        .map_err(|e| build_error("tool use block", e))
}

fn tool_result_block(tool_use_id: &str, content: &str) -> Result<ContentBlock, ModelError> {
    let (body, failed) = match serde_json::from_str::<serde_json::Value>(content) {
        Ok(value) => {
            let failed = value.get("status").and_then(|s| s.as_str()) == Some("error");
            (ToolResultContentBlock::Json(to_document(&value)), failed)
        }
        Err(_) => (ToolResultContentBlock::Text(content.to_string()), false),
    };

    let mut builder = ToolResultBlock::builder()
        .tool_use_id(tool_use_id)
        .content(body);
    if failed {
        builder = builder.status(ToolResultStatus::Error);
    }
    builder
        .build()
        .map(ContentBlock::ToolResult)
        .map_err(|e| build_error("tool result block", e))
}

// ── Response parsing ──────────────────────────────────────────

fn parse_output(output: Option<&ConverseOutput>) -> Result<ModelReply, ModelError> {
    let Some(ConverseOutput::Message(message)) = output else {
        return Err(ModelError::InvalidResponse(
            "no message in converse output".into(),
        ));
    };

    let mut text = String::new();
    let mut calls = Vec::new();
    for block in message.content() {
        match block {
            ContentBlock::Text(t) => text.push_str(t),
            ContentBlock::ToolUse(tool_use) => calls.push(ToolInvocationRequest::new(
                tool_use.tool_use_id(),
                tool_use.name(),
                from_document(tool_use.input()),
            )),
            other => tracing::debug!(block = ?other, "ignoring content block"),
        }
    }
    Ok(ModelReply::from_parts(text, calls))
}

// ── Document conversion ───────────────────────────────────────

/// Convert JSON into a Smithy document.
pub fn to_document(value: &serde_json::Value) -> Document {
    use serde_json::Value;
    match value {
        Value::Null => Document::Null,
        Value::Bool(b) => Document::Bool(*b),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Document::Number(Number::PosInt(u))
            } else if let Some(i) = n.as_i64() {
                Document::Number(Number::NegInt(i))
            } else {
                Document::Number(Number::Float(n.as_f64().unwrap_or_default()))
            }
        }
        Value::String(s) => Document::String(s.clone()),
        Value::Array(items) => Document::Array(items.iter().map(to_document).collect()),
        Value::Object(map) => Document::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), to_document(v)))
                .collect(),
        ),
    }
}

/// Convert a Smithy document into JSON. Non-finite floats become null.
pub fn from_document(doc: &Document) -> serde_json::Value {
    use serde_json::Value;
    match doc {
        Document::Null => Value::Null,
        Document::Bool(b) => Value::Bool(*b),
        Document::Number(Number::PosInt(u)) => Value::from(*u),
        Document::Number(Number::NegInt(i)) => Value::from(*i),
        Document::Number(Number::Float(f)) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Document::String(s) => Value::String(s.clone()),
        Document::Array(items) => Value::Array(items.iter().map(from_document).collect()),
        Document::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_document(v)))
                .collect(),
        ),
    }
}
