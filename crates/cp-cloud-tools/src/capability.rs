//! Capability abstractions: the narrow interface to the cloud provider.
//!
//! Tools never talk to an SDK directly; they go through `ResourceControl`
//! and `LogQuery`, so tests can swap in the in-memory mocks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::CloudResult;

// ── Resource control ──────────────────────────────────────────

/// Progress of an asynchronous resource-control request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_token: Option<String>,
    /// Provider status ("PENDING", "IN_PROGRESS", "SUCCESS", ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

/// A resource and its current properties.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescription {
    pub identifier: Option<String>,
    pub properties: serde_json::Value,
}

/// One page of a resource listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourcePage {
    pub resources: Vec<ResourceDescription>,
    pub next_token: Option<String>,
}

/// One JSON Patch (RFC 6902) operation for resource updates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
    pub value: serde_json::Value,
}

impl PatchOperation {
    pub fn replace(key: &str, value: serde_json::Value) -> Self {
        Self {
            op: "replace".into(),
            path: format!("/{key}"),
            value,
        }
    }
}

/// Unified create/read/update/delete/list interface over cloud resources.
///
/// Mutations are fire-and-poll on the provider side: they return the
/// request's progress event, not the finished resource.
#[async_trait]
pub trait ResourceControl: Send + Sync {
    async fn create_resource(
        &self,
        region: &str,
        resource_type: &str,
        desired_state: &serde_json::Value,
    ) -> CloudResult<ProgressEvent>;

    async fn get_resource(
        &self,
        region: &str,
        resource_type: &str,
        identifier: &str,
    ) -> CloudResult<ResourceDescription>;

    async fn update_resource(
        &self,
        region: &str,
        resource_type: &str,
        identifier: &str,
        patch: &[PatchOperation],
    ) -> CloudResult<ProgressEvent>;

    async fn delete_resource(
        &self,
        region: &str,
        resource_type: &str,
        identifier: &str,
    ) -> CloudResult<ProgressEvent>;

    async fn list_resources(
        &self,
        region: &str,
        resource_type: &str,
        max_results: u32,
        next_token: Option<&str>,
    ) -> CloudResult<ResourcePage>;
}

// ── Log query ─────────────────────────────────────────────────

/// Parameters for a log-filter call.
#[derive(Debug, Clone, PartialEq)]
pub struct LogFilter {
    /// Log group to search (e.g. "/aws/lambda/auth-service").
    pub log_group: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Provider filter pattern; `None` matches everything.
    pub pattern: Option<String>,
}

/// A matched log event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_stream: Option<String>,
}

/// Log filtering interface.
#[async_trait]
pub trait LogQuery: Send + Sync {
    /// Return events in the filter's window matching its pattern.
    /// Ordering is provider-defined.
    async fn filter_events(&self, filter: &LogFilter) -> CloudResult<Vec<LogEvent>>;
}
