//! In-memory capability mocks for testing.
//!
//! `MockResourceControl` keeps resources in insertion order so listings are
//! deterministic, records every call, and can be told to fail the next one.
//! `MockLogQuery` filters stored events by window and substring.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use cp_protocol::Operation;
use serde_json::json;

use crate::capability::{
    LogEvent, LogFilter, LogQuery, PatchOperation, ProgressEvent, ResourceControl,
    ResourceDescription, ResourcePage,
};
use crate::error::{CloudError, CloudResult};

/// Property names tried, in order, to pick an identifier for created resources.
const NAME_PROPERTIES: &[&str] = &["BucketName", "FunctionName", "TableName", "QueueName", "Name"];

/// A recorded capability call.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlCall {
    pub operation: Operation,
    pub region: String,
    pub resource_type: String,
    pub identifier: Option<String>,
    pub patch: Vec<PatchOperation>,
}

#[derive(Debug, Clone)]
struct StoredResource {
    resource_type: String,
    identifier: String,
    properties: serde_json::Value,
}

impl StoredResource {
    fn description(&self) -> ResourceDescription {
        ResourceDescription {
            identifier: Some(self.identifier.clone()),
            properties: self.properties.clone(),
        }
    }
}

/// Mock resource control backed by an in-memory store.
pub struct MockResourceControl {
    resources: Mutex<Vec<StoredResource>>,
    calls: Mutex<Vec<ControlCall>>,
    next_failure: Mutex<Option<CloudError>>,
    omit_tokens: AtomicBool,
    token_seq: AtomicU64,
}

impl MockResourceControl {
    pub fn new() -> Self {
        Self {
            resources: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            next_failure: Mutex::new(None),
            omit_tokens: AtomicBool::new(false),
            token_seq: AtomicU64::new(0),
        }
    }

    /// Three S3 buckets: app-logs, backups, static-assets.
    pub fn with_sample_buckets() -> Self {
        let mock = Self::new();
        for name in ["app-logs", "backups", "static-assets"] {
            mock.add_resource(
                "AWS::S3::Bucket",
                name,
                json!({
                    "BucketName": name,
                    "Arn": format!("arn:aws:s3:::{name}"),
                }),
            );
        }
        mock
    }

    /// Seed a resource.
    pub fn add_resource(
        &self,
        resource_type: &str,
        identifier: &str,
        properties: serde_json::Value,
    ) {
        self.resources.lock().unwrap().push(StoredResource {
            resource_type: resource_type.to_string(),
            identifier: identifier.to_string(),
            properties,
        });
    }

    /// Make the next call fail with `err`.
    pub fn fail_next(&self, err: CloudError) {
        *self.next_failure.lock().unwrap() = Some(err);
    }

    /// Return progress events without a request token from now on.
    pub fn omit_request_tokens(&self) {
        self.omit_tokens.store(true, Ordering::SeqCst);
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<ControlCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of stored resources of a type.
    pub fn count(&self, resource_type: &str) -> usize {
        self.resources
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.resource_type == resource_type)
            .count()
    }

    fn record(
        &self,
        operation: Operation,
        region: &str,
        resource_type: &str,
        identifier: Option<&str>,
        patch: &[PatchOperation],
    ) -> CloudResult<()> {
        self.calls.lock().unwrap().push(ControlCall {
            operation,
            region: region.to_string(),
            resource_type: resource_type.to_string(),
            identifier: identifier.map(str::to_string),
            patch: patch.to_vec(),
        });
        match self.next_failure.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn progress(&self, identifier: &str) -> ProgressEvent {
        let n = self.token_seq.fetch_add(1, Ordering::SeqCst) + 1;
        ProgressEvent {
            request_token: (!self.omit_tokens.load(Ordering::SeqCst))
                .then(|| format!("mock-token-{n}")),
            operation_status: Some("IN_PROGRESS".into()),
            identifier: Some(identifier.to_string()),
            ..Default::default()
        }
    }

    fn position(resources: &[StoredResource], resource_type: &str, identifier: &str) -> CloudResult<usize> {
        resources
            .iter()
            .position(|r| r.resource_type == resource_type && r.identifier == identifier)
            .ok_or_else(|| {
                CloudError::api(
                    "ResourceNotFoundException",
                    format!(
                        "Resource of type '{resource_type}' with identifier '{identifier}' was not found."
                    ),
                )
            })
    }
}

impl Default for MockResourceControl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceControl for MockResourceControl {
    async fn create_resource(
        &self,
        region: &str,
        resource_type: &str,
        desired_state: &serde_json::Value,
    ) -> CloudResult<ProgressEvent> {
        self.record(Operation::Create, region, resource_type, None, &[])?;

        let mut resources = self.resources.lock().unwrap();
        let identifier = NAME_PROPERTIES
            .iter()
            .find_map(|key| desired_state.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string)
            .unwrap_or_else(|| format!("mock-resource-{}", resources.len() + 1));

        if resources
            .iter()
            .any(|r| r.resource_type == resource_type && r.identifier == identifier)
        {
            return Err(CloudError::api(
                "AlreadyExistsException",
                format!("Resource of type '{resource_type}' with identifier '{identifier}' already exists."),
            ));
        }

        resources.push(StoredResource {
            resource_type: resource_type.to_string(),
            identifier: identifier.clone(),
            properties: desired_state.clone(),
        });
        Ok(self.progress(&identifier))
    }

    async fn get_resource(
        &self,
        region: &str,
        resource_type: &str,
        identifier: &str,
    ) -> CloudResult<ResourceDescription> {
        self.record(Operation::Read, region, resource_type, Some(identifier), &[])?;
        let resources = self.resources.lock().unwrap();
        let idx = Self::position(&resources, resource_type, identifier)?;
        Ok(resources[idx].description())
    }

    async fn update_resource(
        &self,
        region: &str,
        resource_type: &str,
        identifier: &str,
        patch: &[PatchOperation],
    ) -> CloudResult<ProgressEvent> {
        self.record(Operation::Update, region, resource_type, Some(identifier), patch)?;
        let mut resources = self.resources.lock().unwrap();
        let idx = Self::position(&resources, resource_type, identifier)?;
        if let Some(props) = resources[idx].properties.as_object_mut() {
            for op in patch {
                props.insert(op.path.trim_start_matches('/').to_string(), op.value.clone());
            }
        }
        Ok(self.progress(identifier))
    }

    async fn delete_resource(
        &self,
        region: &str,
        resource_type: &str,
        identifier: &str,
    ) -> CloudResult<ProgressEvent> {
        self.record(Operation::Delete, region, resource_type, Some(identifier), &[])?;
        let mut resources = self.resources.lock().unwrap();
        let idx = Self::position(&resources, resource_type, identifier)?;
        resources.remove(idx);
        Ok(self.progress(identifier))
    }

    async fn list_resources(
        &self,
        region: &str,
        resource_type: &str,
        max_results: u32,
        next_token: Option<&str>,
    ) -> CloudResult<ResourcePage> {
        self.record(Operation::List, region, resource_type, None, &[])?;

        let offset = match next_token {
            Some(token) => token.parse::<usize>().map_err(|_| {
                CloudError::api("InvalidRequestException", format!("invalid next token: {token}"))
            })?,
            None => 0,
        };

        let resources = self.resources.lock().unwrap();
        let matching: Vec<&StoredResource> = resources
            .iter()
            .filter(|r| r.resource_type == resource_type)
            .collect();
        let end = (offset + max_results as usize).min(matching.len());
        let page = matching
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|r| r.description())
            .collect();

        Ok(ResourcePage {
            resources: page,
            next_token: (end < matching.len()).then(|| end.to_string()),
        })
    }
}

/// Mock log query over stored events.
pub struct MockLogQuery {
    events: Mutex<Vec<(String, LogEvent)>>,
    queries: Mutex<Vec<LogFilter>>,
    next_failure: Mutex<Option<CloudError>>,
}

impl MockLogQuery {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            next_failure: Mutex::new(None),
        }
    }

    pub fn add_event(
        &self,
        log_group: &str,
        timestamp: chrono::DateTime<chrono::Utc>,
        message: impl Into<String>,
    ) {
        self.events.lock().unwrap().push((
            log_group.to_string(),
            LogEvent {
                timestamp,
                message: message.into(),
                log_stream: Some("2024/06/01/[$LATEST]mock".into()),
            },
        ));
    }

    pub fn fail_next(&self, err: CloudError) {
        *self.next_failure.lock().unwrap() = Some(err);
    }

    /// Filters received so far.
    pub fn queries(&self) -> Vec<LogFilter> {
        self.queries.lock().unwrap().clone()
    }
}

impl Default for MockLogQuery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogQuery for MockLogQuery {
    async fn filter_events(&self, filter: &LogFilter) -> CloudResult<Vec<LogEvent>> {
        self.queries.lock().unwrap().push(filter.clone());
        if let Some(err) = self.next_failure.lock().unwrap().take() {
            return Err(err);
        }

        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|(group, _)| *group == filter.log_group)
            .map(|(_, event)| event)
            .filter(|e| e.timestamp >= filter.start && e.timestamp <= filter.end)
            .filter(|e| {
                filter
                    .pattern
                    .as_deref()
                    .is_none_or(|p| e.message.contains(p))
            })
            .cloned()
            .collect())
    }
}
