//! CloudPilot agent: library crate for the tool-calling turn loop.
//!
//! Wires the model client, tool registry, operation executor, and
//! summarizer into `TurnOrchestrator::process_turn`. Modules are public so
//! `cp-e2e-tests` can assemble the same pieces with mocks.

pub mod config;
pub mod error;
pub mod mock;
pub mod model;
pub mod orchestrator;
pub mod prompts;
pub mod registry;
pub mod session;
pub mod summarizer;

pub use config::AgentConfig;
pub use error::{AgentError, AgentResult};
pub use orchestrator::TurnOrchestrator;
pub use registry::ToolRegistry;
pub use session::{AwsClientFactory, ClientFactory, CloudClients, SessionContext};
