//! Shared types for the CloudPilot orchestration engine.
//!
//! Everything that crosses a crate boundary lives here: the conversation
//! transcript (`Message`), the tool catalog entries handed to the model
//! (`ToolSpec`), the model's tool requests (`ToolInvocationRequest`), and the
//! normalized result of executing one (`OperationResult`).

pub mod messages;
pub mod operations;
pub mod tools;

pub use messages::*;
pub use operations::*;
pub use tools::*;
