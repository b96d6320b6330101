//! AWS SDK implementations of the capability traits.
//!
//! `AwsResourceControl` wraps the Cloud Control API and builds a client per
//! call so each request can target its own region. `AwsLogQuery` wraps
//! CloudWatch Logs `FilterLogEvents`.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudcontrol::config::Region;
use aws_sdk_cloudcontrol::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudcontrol::types as cc;
use chrono::DateTime;

use crate::capability::{
    LogEvent, LogFilter, LogQuery, PatchOperation, ProgressEvent, ResourceControl,
    ResourceDescription, ResourcePage,
};
use crate::error::{CloudError, CloudResult};

/// Map any SDK operation error into a `CloudError`.
///
/// Transport-level failures (no response received) become `Connection`;
/// everything the service answered becomes `Api` with its error code.
pub fn sdk_error<E, R>(err: SdkError<E, R>) -> CloudError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let detail = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => CloudError::Connection(detail),
        _ => CloudError::Api {
            code: err.code().map(str::to_string),
            message: err.message().map(str::to_string).unwrap_or(detail),
        },
    }
}

// ── Cloud Control ─────────────────────────────────────────────

/// Cloud Control API backed resource control.
pub struct AwsResourceControl {
    sdk_config: SdkConfig,
}

impl AwsResourceControl {
    pub fn new(sdk_config: SdkConfig) -> Self {
        Self { sdk_config }
    }

    fn client(&self, region: &str) -> aws_sdk_cloudcontrol::Client {
        let conf = aws_sdk_cloudcontrol::config::Builder::from(&self.sdk_config)
            .region(Region::new(region.to_string()))
            .build();
        aws_sdk_cloudcontrol::Client::from_conf(conf)
    }
}

fn progress_from(event: Option<&cc::ProgressEvent>) -> CloudResult<ProgressEvent> {
    let event = event
        .ok_or_else(|| CloudError::InvalidResponse("response carried no ProgressEvent".into()))?;
    Ok(ProgressEvent {
        request_token: event.request_token().map(str::to_string),
        operation_status: event.operation_status().map(|s| s.as_str().to_string()),
        identifier: event.identifier().map(str::to_string),
        status_message: event.status_message().map(str::to_string),
        error_code: event.error_code().map(|c| c.as_str().to_string()),
    })
}

fn description_from(desc: &cc::ResourceDescription) -> CloudResult<ResourceDescription> {
    let properties = match desc.properties() {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| CloudError::InvalidResponse(format!("resource properties: {e}")))?,
        None => serde_json::Value::Object(Default::default()),
    };
    Ok(ResourceDescription {
        identifier: desc.identifier().map(str::to_string),
        properties,
    })
}

#[async_trait]
impl ResourceControl for AwsResourceControl {
    async fn create_resource(
        &self,
        region: &str,
        resource_type: &str,
        desired_state: &serde_json::Value,
    ) -> CloudResult<ProgressEvent> {
        let output = self
            .client(region)
            .create_resource()
            .type_name(resource_type)
            .desired_state(desired_state.to_string())
            .send()
            .await
            .map_err(sdk_error)?;
        tracing::debug!(?output, "create_resource response");
        progress_from(output.progress_event())
    }

    async fn get_resource(
        &self,
        region: &str,
        resource_type: &str,
        identifier: &str,
    ) -> CloudResult<ResourceDescription> {
        let output = self
            .client(region)
            .get_resource()
            .type_name(resource_type)
            .identifier(identifier)
            .send()
            .await
            .map_err(sdk_error)?;
        let desc = output.resource_description().ok_or_else(|| {
            CloudError::InvalidResponse("response carried no ResourceDescription".into())
        })?;
        description_from(desc)
    }

    async fn update_resource(
        &self,
        region: &str,
        resource_type: &str,
        identifier: &str,
        patch: &[PatchOperation],
    ) -> CloudResult<ProgressEvent> {
        let patch_document = serde_json::to_string(patch)
            .map_err(|e| CloudError::InvalidResponse(format!("patch document: {e}")))?;
        let output = self
            .client(region)
            .update_resource()
            .type_name(resource_type)
            .identifier(identifier)
            .patch_document(patch_document)
            .send()
            .await
            .map_err(sdk_error)?;
        tracing::debug!(?output, "update_resource response");
        progress_from(output.progress_event())
    }

    async fn delete_resource(
        &self,
        region: &str,
        resource_type: &str,
        identifier: &str,
    ) -> CloudResult<ProgressEvent> {
        let output = self
            .client(region)
            .delete_resource()
            .type_name(resource_type)
            .identifier(identifier)
            .send()
            .await
            .map_err(sdk_error)?;
        tracing::debug!(?output, "delete_resource response");
        progress_from(output.progress_event())
    }

    async fn list_resources(
        &self,
        region: &str,
        resource_type: &str,
        max_results: u32,
        next_token: Option<&str>,
    ) -> CloudResult<ResourcePage> {
        let output = self
            .client(region)
            .list_resources()
            .type_name(resource_type)
            .max_results(max_results as i32)
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .map_err(sdk_error)?;

        let resources = output
            .resource_descriptions()
            .iter()
            .map(description_from)
            .collect::<CloudResult<Vec<_>>>()?;

        Ok(ResourcePage {
            resources,
            next_token: output.next_token().map(str::to_string),
        })
    }
}

// ── CloudWatch Logs ───────────────────────────────────────────

/// CloudWatch Logs backed log query.
pub struct AwsLogQuery {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl AwsLogQuery {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_cloudwatchlogs::Client::new(sdk_config),
        }
    }
}

/// Upper bound on `FilterLogEvents` pages read for one query.
pub const MAX_LOG_PAGES: usize = 10;

#[async_trait]
impl LogQuery for AwsLogQuery {
    async fn filter_events(&self, filter: &LogFilter) -> CloudResult<Vec<LogEvent>> {
        let mut events = Vec::new();
        let mut next_token: Option<String> = None;

        // A page may be empty or partial and still carry a token.
        for page in 1..=MAX_LOG_PAGES {
            let output = self
                .client
                .filter_log_events()
                .log_group_name(&filter.log_group)
                .start_time(filter.start.timestamp_millis())
                .end_time(filter.end.timestamp_millis())
                .set_filter_pattern(filter.pattern.clone())
                .set_next_token(next_token.clone())
                .send()
                .await
                .map_err(sdk_error)?;

            events.extend(output.events().iter().filter_map(|event| {
                let timestamp = DateTime::from_timestamp_millis(event.timestamp()?)?;
                Some(LogEvent {
                    timestamp,
                    message: event.message().unwrap_or_default().trim_end().to_string(),
                    log_stream: event.log_stream_name().map(str::to_string),
                })
            }));

            match output.next_token() {
                Some(token) if next_token.as_deref() != Some(token) => {
                    next_token = Some(token.to_string());
                }
                _ => return Ok(events),
            }
            if page == MAX_LOG_PAGES {
                tracing::warn!(
                    log_group = %filter.log_group,
                    pages = MAX_LOG_PAGES,
                    matched = events.len(),
                    "log query stopped at page limit"
                );
            }
        }
        Ok(events)
    }
}
