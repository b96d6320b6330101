//! E2E tests for the Bedrock Converse client against a wiremock endpoint.
//!
//! These drive the real SDK request/response path: JSON rendering of the
//! transcript and tool config, parsing of text and toolUse replies, and
//! mapping of service errors and timeouts.

mod helpers;

use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cp_agent::model::{BedrockModelClient, CompletionRequest, ModelClient, ModelError, ModelReply};
use cp_agent::prompts::SYSTEM_PROMPT;
use cp_agent::ToolRegistry;
use cp_protocol::{Message, OperationResult, ToolExchange, ToolInvocationRequest};
use helpers::local_sdk_config;

const MODEL_ID: &str = "anthropic.claude-3-5-sonnet-20240620-v1:0";

async fn client_for(server: &MockServer, timeout: Duration) -> BedrockModelClient {
    let sdk_config = local_sdk_config(&server.uri()).await;
    BedrockModelClient::new(
        aws_sdk_bedrockruntime::Client::new(&sdk_config),
        MODEL_ID,
        timeout,
    )
}

fn converse_body(content: Value, stop_reason: &str) -> Value {
    json!({
        "output": {"message": {"role": "assistant", "content": content}},
        "stopReason": stop_reason,
        "usage": {"inputTokens": 12, "outputTokens": 7, "totalTokens": 19},
        "metrics": {"latencyMs": 42}
    })
}

fn converse_mock(body: Value) -> Mock {
    Mock::given(method("POST"))
        .and(path_regex(r"^/model/.+/converse$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
}

async fn sent_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).expect("request body is JSON"))
        .collect()
}

/// Plain text reply with system prompt and tool config on the wire.
#[tokio::test]
async fn e2e_bedrock_text_reply() {
    let server = MockServer::start().await;
    converse_mock(converse_body(
        json!([{"text": "You have 3 S3 buckets."}]),
        "end_turn",
    ))
    .expect(1)
    .mount(&server)
    .await;

    let client = client_for(&server, Duration::from_secs(5)).await;
    let registry = ToolRegistry::with_defaults();
    let messages = [Message::user("List all my S3 buckets")];

    let reply = client
        .complete(CompletionRequest {
            system: Some(SYSTEM_PROMPT),
            messages: &messages,
            tools: Some(registry.list_tools()),
            max_tokens: 2000,
        })
        .await
        .unwrap();

    assert_eq!(reply, ModelReply::Text("You have 3 S3 buckets.".into()));

    let body = &sent_bodies(&server).await[0];
    assert_eq!(body["inferenceConfig"]["maxTokens"], 2000);
    assert_eq!(body["system"][0]["text"], SYSTEM_PROMPT);
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"][0]["text"], "List all my S3 buckets");

    let names: Vec<&str> = body["toolConfig"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["toolSpec"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["aws_cloud_control", "cloudwatch_logs"]);
    assert_eq!(
        body["toolConfig"]["tools"][0]["toolSpec"]["inputSchema"]["json"]["type"],
        "object"
    );
}

/// toolUse blocks come back as tool invocation requests.
#[tokio::test]
async fn e2e_bedrock_tool_use_reply() {
    let server = MockServer::start().await;
    converse_mock(converse_body(
        json!([
            {"text": "Let me look that up."},
            {"toolUse": {
                "toolUseId": "tooluse_abc",
                "name": "aws_cloud_control",
                "input": {"operation": "list", "resource_type": "AWS::S3::Bucket", "max_results": 20}
            }}
        ]),
        "tool_use",
    ))
    .mount(&server)
    .await;

    let client = client_for(&server, Duration::from_secs(5)).await;
    let messages = [Message::user("List all my S3 buckets")];
    let reply = client
        .complete(CompletionRequest {
            system: Some(SYSTEM_PROMPT),
            messages: &messages,
            tools: Some(ToolRegistry::with_defaults().list_tools()),
            max_tokens: 2000,
        })
        .await
        .unwrap();

    let ModelReply::ToolCalls(calls) = reply else {
        panic!("expected tool calls, got {reply:?}");
    };
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "tooluse_abc");
    assert_eq!(calls[0].tool_name, "aws_cloud_control");
    assert_eq!(calls[0].arguments["resource_type"], "AWS::S3::Bucket");
    assert_eq!(calls[0].arguments["max_results"], 20);
}

/// Tool messages in the transcript render as toolUse / toolResult turns.
#[tokio::test]
async fn e2e_bedrock_renders_tool_exchange() {
    let server = MockServer::start().await;
    converse_mock(converse_body(json!([{"text": "done"}]), "end_turn"))
        .mount(&server)
        .await;

    let request = ToolInvocationRequest::new(
        "tooluse_1",
        "aws_cloud_control",
        json!({"operation": "read", "resource_type": "AWS::S3::Bucket", "identifier": "ghost"}),
    );
    let result = OperationResult::failure(
        Some(cp_protocol::Operation::Read),
        "AWS::S3::Bucket",
        cp_protocol::FailureKind::ToolExecution,
        "Failed to read resource: not found",
    );
    let messages = [
        Message::user("read ghost"),
        Message::tool_result(&ToolExchange { request, result }),
        Message::assistant("It does not exist."),
        Message::user("ok thanks"),
    ];

    let client = client_for(&server, Duration::from_secs(5)).await;
    client
        .complete(CompletionRequest {
            system: None,
            messages: &messages,
            tools: None,
            max_tokens: 500,
        })
        .await
        .unwrap();

    let body = &sent_bodies(&server).await[0];
    let turns = body["messages"].as_array().unwrap();
    let roles: Vec<&str> = turns.iter().map(|t| t["role"].as_str().unwrap()).collect();
    assert_eq!(roles, vec!["user", "assistant", "user", "assistant", "user"]);

    let tool_use = &turns[1]["content"][0]["toolUse"];
    assert_eq!(tool_use["toolUseId"], "tooluse_1");
    assert_eq!(tool_use["input"]["identifier"], "ghost");

    let tool_result = &turns[2]["content"][0]["toolResult"];
    assert_eq!(tool_result["toolUseId"], "tooluse_1");
    assert_eq!(tool_result["status"], "error");
    assert_eq!(tool_result["content"][0]["json"]["status"], "error");
    assert!(body.get("toolConfig").is_none());
}

/// A service error is an API error, not a connection error.
#[tokio::test]
async fn e2e_bedrock_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/model/.+/converse$"))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("x-amzn-errortype", "ValidationException")
                .set_body_json(json!({"message": "The provided model identifier is invalid."})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5)).await;
    let messages = [Message::user("hi")];
    let err = client
        .complete(CompletionRequest {
            system: None,
            messages: &messages,
            tools: None,
            max_tokens: 10,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ModelError::Api(_)), "got {err:?}");
    assert!(err.to_string().contains("ValidationException"));
}

/// A response slower than the configured timeout fails with Timeout.
#[tokio::test]
async fn e2e_bedrock_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/model/.+/converse$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(converse_body(json!([{"text": "late"}]), "end_turn"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(1)).await;
    let messages = [Message::user("hi")];
    let err = client
        .complete(CompletionRequest {
            system: None,
            messages: &messages,
            tools: None,
            max_tokens: 10,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ModelError::Timeout { timeout_secs: 1 }), "got {err:?}");
}

/// The connectivity check is a one-token round trip.
#[tokio::test]
async fn e2e_bedrock_connection_check() {
    let server = MockServer::start().await;
    converse_mock(converse_body(json!([{"text": "p"}]), "max_tokens"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Duration::from_secs(5)).await;
    client.check_connection().await.unwrap();

    let body = &sent_bodies(&server).await[0];
    assert_eq!(body["inferenceConfig"]["maxTokens"], 1);
}
