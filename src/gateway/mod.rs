//! Gateway orchestrator and its HTTP surface
//!
//! Composes the interceptor, risk engine, router, sandbox executor,
//! downstream-agent dispatcher, SQL firewall and audit log.

mod handler;
mod server;

pub use handler::gateway_router;
pub use server::{
    AgentMessageResponse, ExecuteResponse, Gateway, GatewayBuilder, Inspection, ValidateResponse,
};

#[cfg(test)]
pub(crate) use server::tests as server_tests;
