//! Cloud tools for CloudPilot.
//!
//! Provides the two tool families the model may call (`aws_cloud_control`
//! and `cloudwatch_logs`), the capability traits they run against
//! (`ResourceControl`, `LogQuery`) with AWS SDK and in-memory
//! implementations, and the `OperationExecutor` that turns a model tool
//! request into a normalized `OperationResult`.

pub mod aws;
pub mod capability;
pub mod error;
pub mod executor;
pub mod mock;
pub mod tools;

// Re-export key types for convenience
pub use aws::{AwsLogQuery, AwsResourceControl};
pub use capability::{
    LogEvent, LogFilter, LogQuery, PatchOperation, ProgressEvent, ResourceControl,
    ResourceDescription, ResourcePage,
};
pub use error::{CloudError, CloudResult};
pub use executor::{ExecutorConfig, OperationExecutor};
pub use mock::{ControlCall, MockLogQuery, MockResourceControl};
pub use tools::{CloudTool, ToolArguments, ToolId, all_specs};
