//! Test doubles for the model and the client factory.
//!
//! `ScriptedModelClient` returns queued replies in FIFO order and records
//! every request. `StaticClientFactory` hands out fixed clients and counts
//! how often each was built.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use cp_cloud_tools::{MockLogQuery, MockResourceControl};
use cp_protocol::{Message, ToolInvocationRequest};

use crate::error::{AgentError, AgentResult};
use crate::model::{CompletionRequest, ModelClient, ModelError, ModelReply};
use crate::session::{ClientFactory, CloudClients};

/// A recorded `complete` call.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
    pub max_tokens: i32,
}

/// Model client with scripted replies.
pub struct ScriptedModelClient {
    replies: Mutex<VecDeque<Result<ModelReply, ModelError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    check_failure: Mutex<Option<ModelError>>,
}

impl ScriptedModelClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            check_failure: Mutex::new(None),
        }
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push_reply(Ok(ModelReply::Text(text.into())));
    }

    pub fn push_tool_calls(&self, calls: Vec<ToolInvocationRequest>) {
        self.push_reply(Ok(ModelReply::ToolCalls(calls)));
    }

    pub fn push_error(&self, err: ModelError) {
        self.push_reply(Err(err));
    }

    pub fn push_reply(&self, reply: Result<ModelReply, ModelError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Fail the next connectivity check.
    pub fn fail_connection_check(&self, err: ModelError) {
        *self.check_failure.lock().unwrap() = Some(err);
    }

    /// All `complete` calls so far. Connectivity checks are not recorded.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

impl Default for ScriptedModelClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<ModelReply, ModelError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            system: request.system.map(str::to_string),
            messages: request.messages.to_vec(),
            tool_names: request
                .tools
                .unwrap_or_default()
                .iter()
                .map(|t| t.name.clone())
                .collect(),
            max_tokens: request.max_tokens,
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::InvalidResponse("no scripted reply left".into())))
    }

    async fn check_connection(&self) -> Result<(), ModelError> {
        match self.check_failure.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Factory returning fixed clients.
pub struct StaticClientFactory {
    model: Arc<dyn ModelClient>,
    cloud: CloudClients,
    cloud_failure: Option<String>,
    model_builds: AtomicUsize,
    cloud_builds: AtomicUsize,
}

impl StaticClientFactory {
    /// Use `model` and empty in-memory cloud mocks.
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self {
            model,
            cloud: CloudClients {
                resources: Arc::new(MockResourceControl::new()),
                logs: Arc::new(MockLogQuery::new()),
            },
            cloud_failure: None,
            model_builds: AtomicUsize::new(0),
            cloud_builds: AtomicUsize::new(0),
        }
    }

    pub fn with_cloud(mut self, cloud: CloudClients) -> Self {
        self.cloud = cloud;
        self
    }

    /// Make every cloud construction fail with a connection error.
    pub fn with_cloud_failure(mut self, message: impl Into<String>) -> Self {
        self.cloud_failure = Some(message.into());
        self
    }

    pub fn model_builds(&self) -> usize {
        self.model_builds.load(Ordering::SeqCst)
    }

    pub fn cloud_builds(&self) -> usize {
        self.cloud_builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientFactory for StaticClientFactory {
    async fn model_client(&self) -> AgentResult<Arc<dyn ModelClient>> {
        self.model_builds.fetch_add(1, Ordering::SeqCst);
        // Give concurrent callers a chance to race on the session cell.
        tokio::task::yield_now().await;
        Ok(self.model.clone())
    }

    async fn cloud_clients(&self) -> AgentResult<CloudClients> {
        self.cloud_builds.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        match &self.cloud_failure {
            Some(message) => Err(AgentError::Connection(message.clone())),
            None => Ok(self.cloud.clone()),
        }
    }
}
