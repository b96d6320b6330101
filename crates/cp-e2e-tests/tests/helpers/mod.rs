//! Shared test harness for E2E integration tests.
//!
//! Wires a real `TurnOrchestrator`, `SessionContext`, and `OperationExecutor`
//! to a scripted model and in-memory cloud capabilities, so every test
//! exercises the real code paths across crate boundaries.

#![allow(dead_code)]

use std::sync::Arc;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_bedrockruntime::config::Credentials;
use cp_agent::mock::{ScriptedModelClient, StaticClientFactory};
use cp_agent::{AgentConfig, AgentResult, CloudClients, SessionContext, ToolRegistry, TurnOrchestrator};
use cp_cloud_tools::{MockLogQuery, MockResourceControl};
use cp_protocol::{Message, OperationResult, ToolInvocationRequest, TurnOutcome};
use serde_json::json;

pub struct TestHarness {
    /// Scripted model shared by the turn and summary calls.
    pub model: Arc<ScriptedModelClient>,
    pub resources: Arc<MockResourceControl>,
    pub logs: Arc<MockLogQuery>,
    pub factory: Arc<StaticClientFactory>,
    pub session: Arc<SessionContext>,
    pub orchestrator: TurnOrchestrator,
}

impl TestHarness {
    /// Harness whose account holds three S3 buckets.
    pub fn with_sample_buckets() -> Self {
        Self::build(MockResourceControl::with_sample_buckets())
    }

    /// Harness with an empty account.
    pub fn empty() -> Self {
        Self::build(MockResourceControl::new())
    }

    fn build(resources: MockResourceControl) -> Self {
        let model = Arc::new(ScriptedModelClient::new());
        let resources = Arc::new(resources);
        let logs = Arc::new(MockLogQuery::new());

        let factory = Arc::new(StaticClientFactory::new(model.clone()).with_cloud(CloudClients {
            resources: resources.clone(),
            logs: logs.clone(),
        }));
        let session = Arc::new(SessionContext::new(factory.clone()));
        let orchestrator = TurnOrchestrator::new(
            session.clone(),
            Arc::new(ToolRegistry::with_defaults()),
            &AgentConfig::default(),
        );

        Self {
            model,
            resources,
            logs,
            factory,
            session,
            orchestrator,
        }
    }

    pub async fn turn(&self, message: &str, history: &[Message]) -> AgentResult<TurnOutcome> {
        self.orchestrator.process_turn(message, history).await
    }

    /// Tool results recorded in a transcript, in order.
    pub fn tool_results(history: &[Message]) -> Vec<OperationResult> {
        history
            .iter()
            .filter(|m| m.is_tool_result())
            .map(|m| serde_json::from_str(&m.content).expect("tool message holds an OperationResult"))
            .collect()
    }
}

pub fn cloud_call(id: &str, args: serde_json::Value) -> ToolInvocationRequest {
    ToolInvocationRequest::new(id, "aws_cloud_control", args)
}

pub fn list_buckets(id: &str) -> ToolInvocationRequest {
    cloud_call(
        id,
        json!({"operation": "list", "resource_type": "AWS::S3::Bucket"}),
    )
}

/// SDK config with static credentials, pointed at a local mock endpoint.
pub async fn local_sdk_config(endpoint: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(Credentials::new("test", "test", None, None, "static"))
        .endpoint_url(endpoint)
        .load()
        .await
}
