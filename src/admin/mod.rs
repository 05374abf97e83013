//! Policy flags and the agent directory
//!
//! Both are plain services injected into the HTTP layer and the gateway.

mod directory;
pub mod handler;
mod policy;

pub use directory::{AgentDirectory, AgentRecord, AgentStatus};
pub use handler::{admin_router, AdminState};
pub use policy::{PolicyService, PolicyUpdate, PolicyUpdated, DEFAULT_POLICIES};
