//! aws_cloud_control: create/read/update/delete/list through Cloud Control.
//!
//! Mutations are accepted by the provider and finish asynchronously; the
//! result reports the request token and leaves completion pending.

use std::sync::LazyLock;

use cp_protocol::{FailureKind, Operation, OperationResult};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use super::CloudTool;
use crate::capability::{PatchOperation, ProgressEvent, ResourceControl};
use crate::error::{CloudError, CloudResult};
use crate::executor::ExecutorConfig;

pub const TOOL_NAME: &str = "aws_cloud_control";

/// Upper bound the Cloud Control API accepts for `MaxResults`.
pub const MAX_LIST_RESULTS: u32 = 100;

const MAX_IDENTIFIER_LEN: usize = 2048;

/// Regions the tool accepts.
pub const SUPPORTED_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "eu-north-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-south-1",
    "sa-east-1",
    "ca-central-1",
    "me-south-1",
    "af-south-1",
];

static RE_RESOURCE_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^AWS::[A-Za-z0-9]+::[A-Za-z0-9]+$").unwrap());

static RE_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_\-:./]+$").unwrap());

pub struct CloudControl;

impl CloudTool for CloudControl {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Create, read, update, delete, or list AWS resources through the AWS Cloud Control API. \
         Create, update, and delete are asynchronous: they return a request token and the \
         resource finishes provisioning in the background."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["create", "read", "update", "delete", "list"],
                    "description": "The operation to perform"
                },
                "resource_type": {
                    "type": "string",
                    "description": "CloudFormation resource type, e.g. AWS::S3::Bucket"
                },
                "identifier": {
                    "type": "string",
                    "description": "Primary identifier of the resource (required for read, update, delete)"
                },
                "properties": {
                    "type": "object",
                    "description": "Desired resource properties (create) or properties to replace (update)"
                },
                "region": {
                    "type": "string",
                    "description": "AWS region (default: us-east-1)"
                },
                "max_results": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": MAX_LIST_RESULTS,
                    "description": "Maximum number of resources to return for list (default: 20)"
                },
                "next_token": {
                    "type": "string",
                    "description": "Pagination token from a previous list result"
                }
            },
            "required": ["operation", "resource_type"]
        })
    }
}

/// Arguments as sent by the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CloudControlArgs {
    pub operation: Operation,
    pub resource_type: String,
    #[serde(default, alias = "resource_identifier")]
    pub identifier: Option<String>,
    #[serde(default)]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub max_results: Option<u32>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// Validated request with defaults resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudControlRequest {
    pub operation: Operation,
    pub resource_type: String,
    pub identifier: Option<String>,
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub region: String,
    pub max_results: u32,
    pub next_token: Option<String>,
}

impl CloudControlArgs {
    /// Check argument shape and resolve defaults from `config`.
    pub fn validate(self, config: &ExecutorConfig) -> Result<CloudControlRequest, String> {
        let resource_type = self.resource_type.trim().to_string();
        if !RE_RESOURCE_TYPE.is_match(&resource_type) {
            return Err(format!(
                "Invalid AWS resource type format: {resource_type}. Expected format: AWS::Service::Resource"
            ));
        }

        let identifier = self
            .identifier
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        if let Some(id) = &identifier {
            if id.len() > MAX_IDENTIFIER_LEN || !RE_IDENTIFIER.is_match(id) {
                return Err(format!(
                    "Invalid identifier format: {id}. Only alphanumeric characters, underscores, \
                     hyphens, colons, slashes, and dots allowed."
                ));
            }
        }

        let region = self
            .region
            .map(|r| r.trim().to_string())
            .unwrap_or_else(|| config.default_region.clone());
        if !SUPPORTED_REGIONS.contains(&region.as_str()) {
            return Err(format!("Invalid AWS region: {region}"));
        }

        let max_results = self.max_results.unwrap_or(config.default_max_results);
        if !(1..=MAX_LIST_RESULTS).contains(&max_results) {
            return Err(format!(
                "max_results must be between 1 and {MAX_LIST_RESULTS}, got {max_results}"
            ));
        }

        if self.operation.requires_identifier() && identifier.is_none() {
            return Err(format!(
                "Operation '{}' requires an identifier",
                self.operation
            ));
        }

        let properties = self.properties.unwrap_or_default();
        if self.operation == Operation::Update && properties.is_empty() {
            return Err("Properties are required for update operations".into());
        }

        Ok(CloudControlRequest {
            operation: self.operation,
            resource_type,
            identifier,
            properties,
            region,
            max_results,
            next_token: self.next_token.filter(|t| !t.is_empty()),
        })
    }
}

/// Run a validated request. Capability failures become error results.
pub async fn execute(request: CloudControlRequest, control: &dyn ResourceControl) -> OperationResult {
    tracing::info!(
        operation = %request.operation,
        resource_type = %request.resource_type,
        region = %request.region,
        "executing cloud control operation"
    );

    let outcome = match request.operation {
        Operation::Create => create(&request, control).await,
        Operation::Read => read(&request, control).await,
        Operation::Update => update(&request, control).await,
        Operation::Delete => delete(&request, control).await,
        Operation::List => list(&request, control).await,
    };

    outcome.unwrap_or_else(|err| {
        tracing::error!(
            operation = %request.operation,
            resource_type = %request.resource_type,
            error = %err,
            "cloud control operation failed"
        );
        let mut result = OperationResult::failure(
            Some(request.operation),
            &request.resource_type,
            FailureKind::ToolExecution,
            format!("Failed to {} resource: {err}", request.operation),
        )
        .with_error_code(err.code().map(str::to_string));
        result.identifier = request.identifier.clone();
        result
    })
}

fn identifier_of(request: &CloudControlRequest) -> &str {
    request.identifier.as_deref().unwrap_or_default()
}

fn accepted(
    request: &CloudControlRequest,
    progress: &ProgressEvent,
    message: String,
) -> OperationResult {
    let mut result = OperationResult::success(request.operation, &request.resource_type)
        .with_message(message)
        .with_payload(serde_json::to_value(progress).unwrap_or_default());
    result.identifier = request
        .identifier
        .clone()
        .or_else(|| progress.identifier.clone());
    result
}

async fn create(
    request: &CloudControlRequest,
    control: &dyn ResourceControl,
) -> CloudResult<OperationResult> {
    let desired_state = serde_json::Value::Object(request.properties.clone());
    let progress = control
        .create_resource(&request.region, &request.resource_type, &desired_state)
        .await?;

    let Some(token) = progress.request_token.as_deref() else {
        return Err(CloudError::InvalidResponse(
            "No request token received from AWS".into(),
        ));
    };

    Ok(accepted(
        request,
        &progress,
        format!(
            "Creating {}... request accepted, completion pending (request token {token})",
            request.resource_type
        ),
    ))
}

async fn read(
    request: &CloudControlRequest,
    control: &dyn ResourceControl,
) -> CloudResult<OperationResult> {
    let identifier = identifier_of(request);
    let desc = control
        .get_resource(&request.region, &request.resource_type, identifier)
        .await?;

    Ok(OperationResult::success(Operation::Read, &request.resource_type)
        .with_identifier(identifier)
        .with_message(format!("Read {} ({identifier})", request.resource_type))
        .with_payload(desc.properties))
}

async fn update(
    request: &CloudControlRequest,
    control: &dyn ResourceControl,
) -> CloudResult<OperationResult> {
    let identifier = identifier_of(request);
    let patch: Vec<PatchOperation> = request
        .properties
        .iter()
        .map(|(key, value)| PatchOperation::replace(key, value.clone()))
        .collect();

    let progress = control
        .update_resource(&request.region, &request.resource_type, identifier, &patch)
        .await?;

    Ok(accepted(
        request,
        &progress,
        format!(
            "Updating {} ({identifier})... request accepted, completion pending",
            request.resource_type
        ),
    ))
}

async fn delete(
    request: &CloudControlRequest,
    control: &dyn ResourceControl,
) -> CloudResult<OperationResult> {
    let identifier = identifier_of(request);
    let progress = control
        .delete_resource(&request.region, &request.resource_type, identifier)
        .await?;

    Ok(accepted(
        request,
        &progress,
        format!(
            "Deleting {} ({identifier})... request accepted, completion pending",
            request.resource_type
        ),
    ))
}

async fn list(
    request: &CloudControlRequest,
    control: &dyn ResourceControl,
) -> CloudResult<OperationResult> {
    let page = control
        .list_resources(
            &request.region,
            &request.resource_type,
            request.max_results,
            request.next_token.as_deref(),
        )
        .await?;

    let count = page.resources.len();
    let more = if page.next_token.is_some() {
        " (more available)"
    } else {
        ""
    };
    let resources: Vec<serde_json::Value> =
        page.resources.into_iter().map(|r| r.properties).collect();

    Ok(OperationResult::success(Operation::List, &request.resource_type)
        .with_message(format!("Retrieved {count} resources{more}"))
        .with_payload(serde_json::Value::Array(resources))
        .with_next_token(page.next_token))
}
