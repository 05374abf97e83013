//! Outbound execution
//!
//! - [`Executor`]: runs an approved command in a sandbox (mock or HTTP)
//! - [`AgentDispatcher`]: hands approved payloads to downstream agent
//!   processes through a bounded worker

mod agent;
mod executor;

pub use agent::{AgentDispatcher, DispatchOutput};
pub use executor::{executor_from_config, ExecutionOutput, Executor, HttpSandbox, MockSandbox};
