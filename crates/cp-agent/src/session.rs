//! Session context: lazily built, validated, shared client handles.
//!
//! Clients are constructed by a `ClientFactory` on first use and memoized in
//! `OnceCell`s. Concurrent first callers share a single construction; a
//! failed construction leaves the cell empty so the next call retries.

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sts::error::DisplayErrorContext;
use cp_cloud_tools::{AwsLogQuery, AwsResourceControl, LogQuery, ResourceControl};
use tokio::sync::OnceCell;

use crate::config::{AwsConfig, ModelConfig};
use crate::error::{AgentError, AgentResult};
use crate::model::{BedrockModelClient, ModelClient};

/// Cloud capability handles.
#[derive(Clone)]
pub struct CloudClients {
    pub resources: Arc<dyn ResourceControl>,
    pub logs: Arc<dyn LogQuery>,
}

/// Builds session clients.
///
/// `cloud_clients` must validate the cloud session before returning; the
/// model client is validated by `SessionContext` through
/// `ModelClient::check_connection`.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn model_client(&self) -> AgentResult<Arc<dyn ModelClient>>;

    async fn cloud_clients(&self) -> AgentResult<CloudClients>;
}

pub struct SessionContext {
    factory: Arc<dyn ClientFactory>,
    model: OnceCell<Arc<dyn ModelClient>>,
    cloud: OnceCell<CloudClients>,
}

impl SessionContext {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            model: OnceCell::new(),
            cloud: OnceCell::new(),
        }
    }

    /// Validated model client.
    pub async fn model_client(&self) -> AgentResult<Arc<dyn ModelClient>> {
        self.model
            .get_or_try_init(|| async {
                let client = self.factory.model_client().await?;
                client.check_connection().await.map_err(|e| {
                    tracing::error!(error = %e, "model connectivity check failed");
                    AgentError::Connection(format!("model connectivity check failed: {e}"))
                })?;
                tracing::info!("model client ready");
                Ok::<_, AgentError>(client)
            })
            .await
            .cloned()
    }

    /// Validated cloud clients.
    pub async fn cloud_clients(&self) -> AgentResult<CloudClients> {
        self.cloud
            .get_or_try_init(|| async {
                let clients = self.factory.cloud_clients().await?;
                tracing::info!("cloud clients ready");
                Ok::<_, AgentError>(clients)
            })
            .await
            .cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.model.initialized() && self.cloud.initialized()
    }
}

// ── AWS factory ───────────────────────────────────────────────

/// Production factory over the default AWS credential chain.
pub struct AwsClientFactory {
    aws: AwsConfig,
    model: ModelConfig,
    sdk_config: OnceCell<SdkConfig>,
}

impl AwsClientFactory {
    pub fn new(aws: AwsConfig, model: ModelConfig) -> Self {
        Self {
            aws,
            model,
            sdk_config: OnceCell::new(),
        }
    }

    async fn sdk_config(&self) -> &SdkConfig {
        self.sdk_config
            .get_or_init(|| async {
                let mut loader = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(self.aws.region.clone()));
                if let Some(profile) = &self.aws.profile {
                    loader = loader.profile_name(profile);
                }
                loader.load().await
            })
            .await
    }
}

#[async_trait]
impl ClientFactory for AwsClientFactory {
    async fn model_client(&self) -> AgentResult<Arc<dyn ModelClient>> {
        let sdk_config = self.sdk_config().await;
        tracing::info!(model_id = %self.model.model_id, "building bedrock client");
        Ok(Arc::new(BedrockModelClient::from_sdk_config(
            sdk_config,
            &self.model,
        )))
    }

    async fn cloud_clients(&self) -> AgentResult<CloudClients> {
        let sdk_config = self.sdk_config().await;

        let identity = aws_sdk_sts::Client::new(sdk_config)
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| {
                AgentError::Connection(format!(
                    "AWS connectivity check failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        tracing::info!(
            account = identity.account().unwrap_or("unknown"),
            region = %self.aws.region,
            "AWS connection validated"
        );

        Ok(CloudClients {
            resources: Arc::new(AwsResourceControl::new(sdk_config.clone())),
            logs: Arc::new(AwsLogQuery::new(sdk_config)),
        })
    }
}
