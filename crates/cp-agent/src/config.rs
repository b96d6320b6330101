//! Agent configuration, loadable from TOML and overridable from environment.

use std::path::Path;

use cp_cloud_tools::ExecutorConfig;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub model: ModelConfig,
    /// Executor defaults for optional tool arguments.
    #[serde(default)]
    pub tools: ExecutorConfig,
    #[serde(default)]
    pub limits: RequestLimits,
}

/// AWS session settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AwsConfig {
    /// Region for the session clients (Bedrock, STS, CloudWatch Logs).
    #[serde(default = "default_region")]
    pub region: String,
    /// Named profile from the shared credentials file.
    #[serde(default)]
    pub profile: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            profile: None,
        }
    }
}

/// Bedrock model settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Token cap for the main turn call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i32,
    /// Token cap for summary and diagnosis calls.
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: i32,
    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Endpoint override (local testing only).
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            max_tokens: default_max_tokens(),
            summary_max_tokens: default_summary_max_tokens(),
            timeout_secs: default_timeout_secs(),
            endpoint_url: None,
        }
    }
}

/// Bounds applied to incoming turn requests.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RequestLimits {
    pub max_message_chars: usize,
    pub max_history_messages: usize,
    pub max_history_message_chars: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_message_chars: 10_000,
            max_history_messages: 100,
            max_history_message_chars: 50_000,
        }
    }
}

fn default_region() -> String {
    "us-east-1".into()
}
fn default_model_id() -> String {
    "anthropic.claude-3-5-sonnet-20240620-v1:0".into()
}
fn default_max_tokens() -> i32 {
    2000
}
fn default_summary_max_tokens() -> i32 {
    500
}
fn default_timeout_secs() -> u64 {
    30
}

impl AgentConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `path` if it exists (defaults otherwise), then apply
    /// environment overrides.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::info!(path, "config file not found, using defaults");
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay values from `lookup` (normally the process environment).
    /// Unparseable numbers are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(region) = lookup("AWS_DEFAULT_REGION") {
            self.aws.region = region.clone();
            self.tools.default_region = region;
        }
        if let Some(profile) = lookup("AWS_PROFILE") {
            self.aws.profile = Some(profile);
        }
        if let Some(model_id) = lookup("BEDROCK_MODEL_ID") {
            self.model.model_id = model_id;
        }
        if let Some(secs) = lookup("BEDROCK_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.model.timeout_secs = secs;
        }
        if let Some(tokens) = lookup("BEDROCK_MAX_TOKENS").and_then(|s| s.parse().ok()) {
            self.model.max_tokens = tokens;
        }
    }
}
