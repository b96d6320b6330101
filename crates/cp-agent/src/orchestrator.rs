//! Turn orchestrator: one user message in, one answer out.
//!
//! ```text
//! AwaitingModel ──text──────────────────────────────► Done
//!       │
//!       └──tool calls──► DispatchingTools ──► AwaitingSummary ──► Done
//! ```
//!
//! At most one tool round per turn. Model failures abort the turn; tool
//! failures are recorded in the transcript and summarized.

use std::sync::Arc;

use cp_cloud_tools::{ExecutorConfig, OperationExecutor};
use cp_protocol::{Message, ToolExchange, ToolInvocationRequest, TurnOutcome};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{AgentConfig, RequestLimits};
use crate::error::{AgentError, AgentResult};
use crate::model::{CompletionRequest, ModelReply};
use crate::prompts::SYSTEM_PROMPT;
use crate::registry::ToolRegistry;
use crate::session::SessionContext;
use crate::summarizer::Summarizer;

/// Turn state.
#[derive(Debug)]
enum TurnState {
    AwaitingModel,
    DispatchingTools(Vec<ToolInvocationRequest>),
    AwaitingSummary(Vec<ToolExchange>),
    Done(String),
}

pub struct TurnOrchestrator {
    session: Arc<SessionContext>,
    registry: Arc<ToolRegistry>,
    summarizer: Summarizer,
    executor_config: ExecutorConfig,
    limits: RequestLimits,
    max_tokens: i32,
}

impl TurnOrchestrator {
    pub fn new(session: Arc<SessionContext>, registry: Arc<ToolRegistry>, config: &AgentConfig) -> Self {
        Self {
            session,
            registry,
            summarizer: Summarizer::new(config.model.summary_max_tokens),
            executor_config: config.tools.clone(),
            limits: config.limits.clone(),
            max_tokens: config.model.max_tokens,
        }
    }

    /// Process one user turn against the caller's `history`.
    ///
    /// `history` is never modified; the returned outcome carries the
    /// extended copy. On error nothing is returned but the error.
    pub async fn process_turn(&self, user_message: &str, history: &[Message]) -> AgentResult<TurnOutcome> {
        self.validate(user_message, history)?;

        let turn_id = Uuid::now_v7();
        let span = tracing::info_span!("turn", %turn_id, history_len = history.len());
        self.run(user_message.trim(), history).instrument(span).await
    }

    fn validate(&self, user_message: &str, history: &[Message]) -> AgentResult<()> {
        let chars = user_message.trim().chars().count();
        if chars == 0 {
            return Err(AgentError::InvalidRequest("message must not be empty".into()));
        }
        if chars > self.limits.max_message_chars {
            return Err(AgentError::InvalidRequest(format!(
                "message is {chars} characters, limit is {}",
                self.limits.max_message_chars
            )));
        }
        if history.len() > self.limits.max_history_messages {
            return Err(AgentError::InvalidRequest(format!(
                "history has {} messages, limit is {}",
                history.len(),
                self.limits.max_history_messages
            )));
        }
        if let Some(pos) = history
            .iter()
            .position(|m| m.content.chars().count() > self.limits.max_history_message_chars)
        {
            return Err(AgentError::InvalidRequest(format!(
                "history message {pos} exceeds {} characters",
                self.limits.max_history_message_chars
            )));
        }
        Ok(())
    }

    async fn run(&self, user_message: &str, history: &[Message]) -> AgentResult<TurnOutcome> {
        let model = self.session.model_client().await?;
        let cloud = self.session.cloud_clients().await?;
        let executor = OperationExecutor::new(cloud.resources, cloud.logs, self.executor_config.clone());

        let mut conversation = history.to_vec();
        conversation.push(Message::user(user_message));

        let mut state = TurnState::AwaitingModel;
        loop {
            state = match state {
                TurnState::AwaitingModel => {
                    let reply = model
                        .complete(CompletionRequest {
                            system: Some(SYSTEM_PROMPT),
                            messages: &conversation,
                            tools: Some(self.registry.list_tools()),
                            max_tokens: self.max_tokens,
                        })
                        .await
                        .inspect_err(|e| tracing::error!(error = %e, "model call failed"))?;

                    match reply {
                        ModelReply::ToolCalls(calls) if !calls.is_empty() => {
                            tracing::info!(count = calls.len(), "model requested tools");
                            TurnState::DispatchingTools(calls)
                        }
                        ModelReply::ToolCalls(_) => TurnState::Done(String::new()),
                        ModelReply::Text(text) => TurnState::Done(text),
                    }
                }

                TurnState::DispatchingTools(calls) => {
                    let mut exchanges = Vec::with_capacity(calls.len());
                    for request in calls {
                        let result = executor.execute(&request).await;
                        let exchange = ToolExchange { request, result };
                        conversation.push(Message::tool_result(&exchange));
                        exchanges.push(exchange);
                    }
                    TurnState::AwaitingSummary(exchanges)
                }

                TurnState::AwaitingSummary(exchanges) => {
                    let summary = self
                        .summarizer
                        .summarize(model.as_ref(), user_message, &exchanges)
                        .await;
                    TurnState::Done(summary)
                }

                TurnState::Done(response) => {
                    conversation.push(Message::assistant(response.clone()));
                    tracing::info!(
                        history_len = conversation.len(),
                        "turn complete"
                    );
                    return Ok(TurnOutcome {
                        response,
                        updated_history: conversation,
                    });
                }
            };
        }
    }
}
